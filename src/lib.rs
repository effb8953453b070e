/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Console reporter that renders monitoring events as logfmt lines.
//!
//! Events (HTTP responses, ops snapshots, errors, outbound calls, requests, logs and anything
//! else) are turned into one `key=value` line each, with HTTP methods and status codes colored
//! for the terminal:
//!
//! ```text
//! instance=localhost method=post path=/data query="" statusCode=200 responseTime=150ms responsePayload="" tags=response timestring=2014-09-24T18:27:44.547Z
//! ```
//!
//! Use `Formatter::transform` to format single events, or `Formatter::attach` to stream events
//! from an `EventSource` into any `Write` sink on a background thread.

use derivative::Derivative;
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use std::thread;

mod color;
mod error;
mod event;
mod fields;
// Write events in logfmt style by default
mod fmt;
mod logfmt;
// background worker that moves events from a source to a sink
mod pipeline;
mod time;

pub use error::{PipelineError, SetupError};
pub use event::{CallOutcome, ErrorDetails, Event, EventKind, Ops, OutboundCall, Response};
pub use fields::{render_value, Fields};
pub use fmt::EventFormatter;
pub use logfmt::LogfmtFormatter;
pub use pipeline::{EventSource, JsonLines, Pipeline, SourceMode};

/// `FormatterConfig` holds the options recognized by the formatter. It can be deserialized from
/// the reporter's configuration object, e.g. `{"useUTC": false}`.
#[derive(Derivative, Deserialize, Clone, Debug, PartialEq, Eq)]
#[derivative(Default)]
#[serde(default)]
pub struct FormatterConfig {
    /// Render timestamps in UTC. When false, the process's local time zone is used.
    #[derivative(Default(value = "true"))]
    #[serde(rename = "useUTC", alias = "utc")]
    pub use_utc: bool,
}

/// `FormatterBuilder` is used to construct the `Formatter` object.
#[must_use = "Has no affect unless .build() is called."]
#[derive(Default)]
pub struct FormatterBuilder {
    config: FormatterConfig,
    formatter: Option<Box<dyn EventFormatter>>,
}

impl FormatterBuilder {
    pub fn new() -> FormatterBuilder {
        FormatterBuilder::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: FormatterConfig) -> FormatterBuilder {
        self.config = config;
        self
    }

    /// Render timestamps in UTC (the default) or in local time.
    pub fn use_utc(mut self, use_utc: bool) -> FormatterBuilder {
        self.config.use_utc = use_utc;
        self
    }

    /// Use a custom `EventFormatter` instead of the logfmt one. The configuration set on this
    /// builder is not passed to custom formatters.
    pub fn formatter(mut self, fmt: Box<dyn EventFormatter>) -> FormatterBuilder {
        self.formatter = Some(fmt);
        self
    }

    pub fn build(self) -> Formatter {
        let config = self.config;
        let fmt: Arc<dyn EventFormatter> = match self.formatter {
            Some(fmt) => Arc::from(fmt),
            None => Arc::new(LogfmtFormatter::new(config.clone())),
        };

        Formatter { config, fmt }
    }
}

/// Turns events into console lines. Create one with `Formatter::new` or the `FormatterBuilder`.
/// Cloning is cheap and clones share the underlying `EventFormatter`.
#[derive(Clone)]
pub struct Formatter {
    config: FormatterConfig,
    fmt: Arc<dyn EventFormatter>,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::new(FormatterConfig::default())
    }
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Formatter {
        FormatterBuilder::new().config(config).build()
    }

    pub fn builder() -> FormatterBuilder {
        FormatterBuilder::new()
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Format one event. The result always ends with a single newline.
    pub fn transform(&self, event: &Event) -> String {
        let mut line = String::with_capacity(256);
        if let Err(e) = self.fmt.write_event(&mut line, event) {
            log::error!("failed to format {} event: {}", event.name, e);
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }

    /// Start moving events from `source` to `sink` on a background thread, one line per event in
    /// source order. Fails without reading anything if the source does not yield whole events.
    pub fn attach<S, W>(&self, source: S, sink: W) -> Result<Pipeline, SetupError>
    where
        S: EventSource + 'static,
        W: Write + Send + 'static,
    {
        check_mode(&source)?;

        let fmt = self.clone();
        let handle = thread::Builder::new()
            .name("logfmt-console".to_owned())
            .spawn(move || pipeline::pump(&fmt, source, sink))
            .map_err(SetupError::Spawn)?;

        Ok(Pipeline { handle })
    }

    /// Like `attach`, but runs on the calling thread and returns once the source ends.
    pub fn run<S, W>(&self, source: S, sink: W) -> Result<u64, PipelineError>
    where
        S: EventSource,
        W: Write,
    {
        check_mode(&source)?;
        pipeline::pump(self, source, sink)
    }
}

fn check_mode<S: EventSource>(source: &S) -> Result<(), SetupError> {
    match source.mode() {
        SourceMode::Structured => Ok(()),
        SourceMode::Raw => Err(SetupError::UnstructuredSource),
    }
}
