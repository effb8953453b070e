/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use crate::{Event, Formatter, PipelineError};
use kanal::Receiver;
use std::io::{BufRead, ErrorKind, Write};
use std::thread::JoinHandle;

/// How a source delivers its input.
#[derive(PartialEq, Debug, Clone, Copy, Eq)]
pub enum SourceMode {
    /// Each read yields one whole decoded event.
    Structured,
    /// Reads yield raw byte chunks. Such sources cannot feed a `Formatter`.
    Raw,
}

/// A source of events for `Formatter::attach`. `next_event` returning `None` ends the stream.
pub trait EventSource: Send {
    fn mode(&self) -> SourceMode;
    fn next_event(&mut self) -> Option<Event>;
}

/// The receiving half of a channel is a structured source that ends once every sender is gone.
impl EventSource for Receiver<Event> {
    fn mode(&self) -> SourceMode {
        SourceMode::Structured
    }

    fn next_event(&mut self) -> Option<Event> {
        self.recv().ok()
    }
}

/// `JsonLines` decodes one JSON object per line. Blank lines are ignored and lines that are not
/// JSON objects are logged and skipped without ending the stream.
pub struct JsonLines<R> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R) -> Self {
        JsonLines {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead + Send> EventSource for JsonLines<R> {
    fn mode(&self) -> SourceMode {
        SourceMode::Structured
    }

    fn next_event(&mut self) -> Option<Event> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line_no += 1;
                    log::warn!("skipping line {}: {}", self.line_no, e);
                    continue;
                }
                Err(e) => {
                    log::error!("failed to read events after line {}: {}", self.line_no, e);
                    return None;
                }
            }

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Event>(line) {
                Ok(event) => return Some(event),
                Err(e) => log::warn!("skipping line {}: {}", self.line_no, e),
            }
        }
    }
}

/// Handle to a running pipeline. Obtained from `Formatter::attach`.
#[must_use = "The pipeline runs in the background; call join() to wait for it."]
pub struct Pipeline {
    pub(crate) handle: JoinHandle<Result<u64, PipelineError>>,
}

impl Pipeline {
    /// Wait for the source to end. Returns the number of lines written.
    pub fn join(self) -> Result<u64, PipelineError> {
        self.handle
            .join()
            .unwrap_or(Err(PipelineError::WorkerPanicked))
    }
}

// Reads, formats and writes one event at a time until the source ends or the sink fails.
pub(crate) fn pump<S, W>(fmt: &Formatter, mut source: S, mut sink: W) -> Result<u64, PipelineError>
where
    S: EventSource,
    W: Write,
{
    let mut written = 0u64;

    while let Some(event) = source.next_event() {
        let line = fmt.transform(&event);
        if let Err(e) = sink.write_all(line.as_bytes()) {
            log::error!("failed to write {} event: {}", event.name, e);
            return Err(e.into());
        }
        written += 1;
    }

    sink.flush()?;
    log::debug!("event source ended after {} lines", written);
    Ok(written)
}
