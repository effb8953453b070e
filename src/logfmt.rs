/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use crate::event::{CallOutcome, ErrorDetails, Event, EventKind, Ops, OutboundCall, Response};
use crate::fields::{render_text, render_value, Fields};
use crate::{color, time, EventFormatter, FormatterConfig};
use serde_json::Value;
use std::fmt::Write;

// Contains all characters that may not appear in logfmt keys
const INVALID_KEY_CHARS: &[char] = &['=', '"'];

// Terminal escape, kept bare in values so colors survive
const ESC: char = '\x1b';

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// `LogfmtFormatter` provides an `EventFormatter` that renders events using the logfmt format, a
/// plain text format that is easy for both humans and machines to read. Each event kind has a
/// fixed set of keys in a fixed order, followed by `tags` and `timestring`. HTTP methods and
/// status codes are colored with ANSI escapes for the terminal.
/// To learn more about logfmt, see: <https://www.brandur.org/logfmt>
#[derive(Default, Debug, Clone)]
pub struct LogfmtFormatter {
    config: FormatterConfig,
}

impl LogfmtFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        LogfmtFormatter { config }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Format a single event into its logfmt line, including the trailing newline.
    pub fn transform(&self, event: &Event) -> String {
        let mut line = String::with_capacity(256);
        // Writing into a String cannot fail
        let _ = self.write_event(&mut line, event);
        line
    }

    /// The kind-specific fields of an event, in output order, before flattening and the trailer.
    pub fn fields(&self, event: &Event) -> Fields {
        match &event.kind {
            EventKind::Response(r) => response_fields(r),
            EventKind::OutboundCall(c) => outbound_call_fields(c),
            EventKind::Ops(o) => ops_fields(o),
            EventKind::Error(e) => error_fields(e),
            EventKind::Request { data } | EventKind::Log { data } => {
                Fields::new().with("data", data.clone().unwrap_or(Value::Null))
            }
            EventKind::Other { data } => {
                let data = match data {
                    Some(v @ (Value::Object(_) | Value::Array(_))) => Value::from(render_text(v)),
                    Some(v) => v.clone(),
                    None => Value::from("(none)"),
                };
                Fields::new().with("data", data)
            }
        }
    }

    /// Write `fields` as one logfmt line, flattening a lone structured `data` field and
    /// appending `tags` and `timestring`.
    pub fn render(
        &self,
        dst: &mut String,
        fields: Fields,
        tags: &[String],
        timestamp: Option<i64>,
    ) -> std::fmt::Result {
        let mut fields = fields.flatten();
        fields.push_last("tags", tags.join(","));
        fields.push_last("timestring", time::timestring(timestamp, self.config.use_utc));

        for (idx, (key, val)) in fields.iter().enumerate() {
            self.write_pair(dst, idx == 0, key, render_value(val).as_deref())?;
        }
        dst.push('\n');
        Ok(())
    }

    /// Write a key value pair to the underlying string. A `None` value is written as `key=`.
    fn write_pair(
        &self,
        dst: &mut String,
        first: bool,
        key: &str,
        val: Option<&str>,
    ) -> std::fmt::Result {
        // Normalize the key
        let mut key: String = key
            .chars()
            .filter(|c| !INVALID_KEY_CHARS.contains(c) && !c.is_control())
            .collect();
        if key.is_empty() {
            key.push('_');
        }

        let val = match val {
            Some(v) => v,
            None => return write!(dst, "{}{}=", if first { "" } else { " " }, key),
        };

        // reformat the value if needed
        let mut formatted_value = String::with_capacity(val.len() + 10);
        let mut need_quotes = val.is_empty();
        for chr in val.chars() {
            match chr {
                '\\' | '"' => {
                    formatted_value.push('\\');
                    formatted_value.push(chr);
                }
                ' ' | '=' => {
                    need_quotes = true;
                    formatted_value.push(chr);
                }
                '\n' => {
                    need_quotes = true;
                    formatted_value.push_str("\\n");
                }
                '\r' => {
                    need_quotes = true;
                    formatted_value.push_str("\\r");
                }
                '\t' => {
                    need_quotes = true;
                    formatted_value.push_str("\\t");
                }
                ESC => formatted_value.push(chr),
                _ => {
                    if !chr.is_control() {
                        formatted_value.push(chr);
                    } else {
                        need_quotes = true;
                        formatted_value.push_str(&chr.escape_unicode().to_string());
                    }
                }
            }
        }

        let quote = if need_quotes { "\"" } else { "" };
        write!(
            dst,
            "{}{}={}{}{}",
            if first { "" } else { " " },
            key,
            quote,
            formatted_value,
            quote
        )
    }
}

impl EventFormatter for LogfmtFormatter {
    fn write_event(&self, dst: &mut String, event: &Event) -> std::fmt::Result {
        let mut tags = Vec::with_capacity(event.tags.len() + 1);
        tags.push(event.name.clone());
        tags.extend(event.tags.iter().cloned());

        self.render(dst, self.fields(event), &tags, event.timestamp)
    }
}

fn with_ms(val: &Option<Value>) -> Value {
    match val {
        Some(v) => Value::from(format!("{}ms", render_text(v))),
        None => Value::Null,
    }
}

fn opt_text(val: &Option<String>) -> Value {
    val.clone().map_or(Value::Null, Value::from)
}

fn response_fields(r: &Response) -> Fields {
    let query = r.query.as_ref().map(render_text).unwrap_or_default();
    let payload = match &r.response_payload {
        Some(p @ (Value::Object(_) | Value::Array(_))) => {
            format!("response payload: {}", render_text(p))
        }
        _ => String::new(),
    };

    Fields::new()
        .with("instance", opt_text(&r.instance))
        .with("method", color::method(r.method.as_deref().unwrap_or_default()))
        .with("path", opt_text(&r.path))
        .with("query", query)
        .with("statusCode", color::status_code(r.status_code).unwrap_or_default())
        .with("responseTime", with_ms(&r.response_time))
        .with("responsePayload", payload)
}

fn outbound_call_fields(c: &OutboundCall) -> Fields {
    let fields = Fields::new()
        .with("method", color::method(c.method.as_deref().unwrap_or_default()))
        .with("requestUrl", opt_text(&c.url));

    match &c.outcome {
        CallOutcome::Failed(err) => fields
            .with("timeSpent", with_ms(&c.time_spent))
            .with("message", opt_text(&err.message))
            .with("stack", opt_text(&err.stack)),
        CallOutcome::Completed {
            status_code,
            status_message,
        } => fields
            .with(
                "statusCode",
                color::status_code(*status_code).map_or(Value::Null, Value::from),
            )
            .with("statusMessage", opt_text(status_message))
            .with("timeSpent", with_ms(&c.time_spent)),
    }
}

fn ops_fields(o: &Ops) -> Fields {
    let memory = o
        .rss
        .map_or(Value::Null, |rss| Value::from(format!("{}Mb", (rss / BYTES_PER_MB).round())));
    let load = o.load.iter().map(render_text).collect::<Vec<_>>().join(",");

    Fields::new()
        .with("memory", memory)
        .with("uptime (seconds)", o.uptime.clone().unwrap_or(Value::Null))
        .with("load", load)
}

fn error_fields(e: &ErrorDetails) -> Fields {
    Fields::new()
        .with("message", opt_text(&e.message))
        .with("stack", opt_text(&e.stack))
}
