/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

use crate::fields::{render_text, render_value};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A monitoring event on its way to the console.
///
/// `name` is the kind as it was received (for example `wreck` and `outboundCall` both decode to
/// `EventKind::OutboundCall`) and always becomes the first tag of the rendered line. `tags` holds
/// the event's own tags, without the name.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Milliseconds since the Unix epoch. `None` renders as the time of formatting.
    pub timestamp: Option<i64>,
    pub tags: Vec<String>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Response(Response),
    Ops(Ops),
    Error(ErrorDetails),
    Request { data: Option<Value> },
    Log { data: Option<Value> },
    OutboundCall(OutboundCall),
    /// Any kind this crate has no dedicated layout for.
    Other { data: Option<Value> },
}

/// A completed HTTP request handled by the monitored server.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Response {
    pub instance: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<u16>,
    pub query: Option<Value>,
    pub response_payload: Option<Value>,
    /// Milliseconds, printed with an `ms` suffix.
    pub response_time: Option<Value>,
}

/// Process and host snapshot.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Ops {
    /// Resident set size in bytes.
    pub rss: Option<f64>,
    /// Process uptime in seconds, printed as received.
    pub uptime: Option<Value>,
    pub load: Vec<Value>,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    pub message: Option<String>,
    pub stack: Option<String>,
}

/// A call the monitored process made to another service.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    pub method: Option<String>,
    pub url: Option<String>,
    /// Milliseconds, printed with an `ms` suffix.
    pub time_spent: Option<Value>,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Completed {
        status_code: Option<u16>,
        status_message: Option<String>,
    },
    Failed(ErrorDetails),
}

impl EventKind {
    /// The name an event of this kind carries when none was received.
    pub fn default_name(&self) -> &'static str {
        match self {
            EventKind::Response(_) => "response",
            EventKind::Ops(_) => "ops",
            EventKind::Error(_) => "error",
            EventKind::Request { .. } => "request",
            EventKind::Log { .. } => "log",
            EventKind::OutboundCall(_) => "outboundCall",
            EventKind::Other { .. } => "unknown",
        }
    }
}

impl Event {
    /// Create an event of the given kind with no tags and no timestamp.
    pub fn new(kind: EventKind) -> Self {
        Event {
            name: kind.default_name().to_owned(),
            timestamp: None,
            tags: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Decode an event from a JSON value. Non-object values yield `None`.
    pub fn from_value(val: &Value) -> Option<Event> {
        val.as_object().map(Event::from_map)
    }

    /// Decode an event from a JSON object. Every field is optional and fields of the wrong type
    /// are treated as missing, so this never fails.
    pub fn from_map(map: &Map<String, Value>) -> Event {
        let name = map
            .get("event")
            .filter(|v| !v.is_null())
            .or_else(|| map.get("kind"))
            .and_then(render_value)
            .unwrap_or_else(|| "unknown".to_owned());

        let kind = match name.as_str() {
            "response" => EventKind::Response(Response {
                instance: text(map, "instance"),
                method: text(map, "method"),
                path: text(map, "path"),
                status_code: status(map.get("statusCode")),
                query: present(map, "query"),
                response_payload: present(map, "responsePayload"),
                response_time: present(map, "responseTime"),
            }),
            "ops" => EventKind::Ops(Ops {
                rss: lookup(map, &["proc", "mem", "rss"]).and_then(Value::as_f64),
                uptime: lookup(map, &["proc", "uptime"])
                    .filter(|v| !v.is_null())
                    .cloned(),
                load: lookup(map, &["os", "load"])
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            }),
            "error" => EventKind::Error(error_details(map.get("error"))),
            "request" => EventKind::Request {
                data: present(map, "data"),
            },
            "log" => EventKind::Log {
                data: present(map, "data"),
            },
            "wreck" | "outboundCall" => {
                let request = map.get("request").and_then(Value::as_object);
                let outcome = match map.get("error").filter(|v| !v.is_null()) {
                    Some(err) => CallOutcome::Failed(error_details(Some(err))),
                    None => {
                        let response = map.get("response").and_then(Value::as_object);
                        CallOutcome::Completed {
                            status_code: status(response.and_then(|r| r.get("statusCode"))),
                            status_message: response.and_then(|r| text(r, "statusMessage")),
                        }
                    }
                };

                EventKind::OutboundCall(OutboundCall {
                    method: request.and_then(|r| text(r, "method")),
                    url: request.and_then(|r| text(r, "url")),
                    time_spent: present(map, "timeSpent"),
                    outcome,
                })
            }
            _ => EventKind::Other {
                data: present(map, "data").filter(is_truthy),
            },
        };

        Event {
            name,
            timestamp: map.get("timestamp").and_then(epoch_millis),
            tags: tag_list(map.get("tags")),
            kind,
        }
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Event::from_map(&map))
    }
}

fn present(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

// Empty strings, zero and false count as missing, along with null.
fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) | Value::Array(_) => true,
    }
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(render_value)
}

fn lookup<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut cur = map;
    for key in parents {
        cur = cur.get(*key)?.as_object()?;
    }
    cur.get(*last)
}

fn error_details(val: Option<&Value>) -> ErrorDetails {
    match val.and_then(Value::as_object) {
        Some(err) => ErrorDetails {
            message: text(err, "message"),
            stack: text(err, "stack"),
        },
        None => ErrorDetails {
            // a bare string error is its own message
            message: val.and_then(render_value),
            stack: None,
        },
    }
}

// Arrays are copied, any other non-null value becomes a single tag.
fn tag_list(val: Option<&Value>) -> Vec<String> {
    match val {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(render_text).collect(),
        Some(other) => vec![render_text(other)],
    }
}

fn status(val: Option<&Value>) -> Option<u16> {
    match val? {
        Value::Number(n) => match n.as_u64() {
            Some(n) => u16::try_from(n).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(f))
                .map(|f| f as u16),
        },
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts epoch milliseconds as a number, or as a string whose leading digits are the value.
fn epoch_millis(val: &Value) -> Option<i64> {
    match val {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|v| sign * v)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(val: Value) -> Event {
        Event::from_value(&val).unwrap()
    }

    #[test]
    fn decodes_response() {
        let ev = decode(json!({
            "event": "response",
            "timestamp": 1411583264547i64,
            "instance": "localhost",
            "method": "post",
            "path": "/data",
            "statusCode": 200,
            "responseTime": 150,
            "query": {"name": "adam"},
        }));

        assert_eq!(ev.name, "response");
        assert_eq!(ev.timestamp, Some(1411583264547));
        assert!(ev.tags.is_empty());
        assert_eq!(
            ev.kind,
            EventKind::Response(Response {
                instance: Some("localhost".to_owned()),
                method: Some("post".to_owned()),
                path: Some("/data".to_owned()),
                status_code: Some(200),
                query: Some(json!({"name": "adam"})),
                response_payload: None,
                response_time: Some(json!(150)),
            })
        );
    }

    #[test]
    fn decodes_ops() {
        let ev = decode(json!({
            "event": "ops",
            "proc": {"uptime": 6, "mem": {"rss": 30019584}},
            "os": {"load": [1.650390625, 1.6162109375, 1.65234375]},
        }));

        assert_eq!(
            ev.kind,
            EventKind::Ops(Ops {
                rss: Some(30019584.0),
                uptime: Some(json!(6)),
                load: vec![json!(1.650390625), json!(1.6162109375), json!(1.65234375)],
            })
        );
    }

    #[test]
    fn ops_with_missing_sections() {
        let ev = decode(json!({"event": "ops", "proc": "nope"}));
        assert_eq!(ev.kind, EventKind::Ops(Ops::default()));
    }

    #[test]
    fn kind_key_is_accepted() {
        let ev = decode(json!({"kind": "log", "data": "hi"}));
        assert_eq!(ev.name, "log");
        assert_eq!(
            ev.kind,
            EventKind::Log {
                data: Some(json!("hi"))
            }
        );
    }

    #[test]
    fn wreck_and_outbound_call_are_the_same_kind() {
        let completed = json!({
            "request": {"method": "GET", "url": "http://localhost/test"},
            "response": {"statusCode": 200, "statusMessage": "OK"},
            "timeSpent": 29,
        });

        for name in ["wreck", "outboundCall"] {
            let mut val = completed.clone();
            val["event"] = json!(name);
            let ev = decode(val);

            assert_eq!(ev.name, name);
            assert_eq!(
                ev.kind,
                EventKind::OutboundCall(OutboundCall {
                    method: Some("GET".to_owned()),
                    url: Some("http://localhost/test".to_owned()),
                    time_spent: Some(json!(29)),
                    outcome: CallOutcome::Completed {
                        status_code: Some(200),
                        status_message: Some("OK".to_owned()),
                    },
                })
            );
        }
    }

    #[test]
    fn failed_outbound_call_prefers_error() {
        let ev = decode(json!({
            "event": "wreck",
            "request": {"method": "GET", "url": "http://localhost/test"},
            "error": {"message": "test error", "stack": "test stack"},
            "response": {"statusCode": null},
        }));

        match ev.kind {
            EventKind::OutboundCall(call) => assert_eq!(
                call.outcome,
                CallOutcome::Failed(ErrorDetails {
                    message: Some("test error".to_owned()),
                    stack: Some("test stack".to_owned()),
                })
            ),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(
            decode(json!({"event": "log", "tags": ["user", "info"]})).tags,
            ["user", "info"]
        );
        assert_eq!(decode(json!({"event": "log", "tags": "user"})).tags, ["user"]);
        assert_eq!(decode(json!({"event": "log", "tags": 7})).tags, ["7"]);
        assert!(decode(json!({"event": "log", "tags": null})).tags.is_empty());
        assert!(decode(json!({"event": "log"})).tags.is_empty());
    }

    #[test]
    fn timestamps() {
        let ts = |v: Value| decode(json!({"event": "log", "timestamp": v})).timestamp;

        assert_eq!(ts(json!(1411583264547i64)), Some(1411583264547));
        assert_eq!(ts(json!("1411583264547")), Some(1411583264547));
        assert_eq!(ts(json!("1411583264547abc")), Some(1411583264547));
        assert_eq!(ts(json!(1411583264547.9)), Some(1411583264547));
        assert_eq!(ts(json!("soon")), None);
        assert_eq!(ts(json!(true)), None);
        assert_eq!(decode(json!({"event": "log"})).timestamp, None);
    }

    #[test]
    fn unknown_and_missing_kinds() {
        let ev = decode(json!({"event": "test", "data": {"reason": "for testing"}}));
        assert_eq!(ev.name, "test");
        assert_eq!(
            ev.kind,
            EventKind::Other {
                data: Some(json!({"reason": "for testing"}))
            }
        );

        let ev = decode(json!({}));
        assert_eq!(ev.name, "unknown");
        assert_eq!(ev.kind, EventKind::Other { data: None });
    }

    #[test]
    fn null_event_falls_back_to_kind() {
        let ev = decode(json!({"event": null, "kind": "log", "data": "x"}));
        assert_eq!(ev.name, "log");
        assert_eq!(
            ev.kind,
            EventKind::Log {
                data: Some(json!("x"))
            }
        );
    }

    #[test]
    fn falsy_data_of_unknown_kinds_is_missing() {
        for data in [json!(""), json!(0), json!(0.0), json!(false)] {
            let ev = decode(json!({"event": "test", "data": data}));
            assert_eq!(ev.kind, EventKind::Other { data: None });
        }

        let ev = decode(json!({"event": "test", "data": "0"}));
        assert_eq!(ev.kind, EventKind::Other { data: Some(json!("0")) });
    }

    #[test]
    fn whole_float_status_codes() {
        let code = |v: Value| match decode(json!({"event": "response", "statusCode": v})).kind {
            EventKind::Response(r) => r.status_code,
            other => panic!("unexpected kind {:?}", other),
        };

        assert_eq!(code(json!(200.0)), Some(200));
        assert_eq!(code(json!(404)), Some(404));
        assert_eq!(code(json!(200.5)), None);
        assert_eq!(code(json!(-1)), None);
        assert_eq!(code(json!(70000.0)), None);
    }

    #[test]
    fn wrong_types_degrade_to_missing() {
        let ev = decode(json!({
            "event": "response",
            "statusCode": "abc",
            "method": null,
            "instance": 3,
        }));

        match ev.kind {
            EventKind::Response(r) => {
                assert_eq!(r.status_code, None);
                assert_eq!(r.method, None);
                assert_eq!(r.instance.as_deref(), Some("3"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn non_objects_are_not_events() {
        assert!(Event::from_value(&json!("a string")).is_none());
        assert!(serde_json::from_str::<Event>("[1, 2]").is_err());
    }

    #[test]
    fn deserializes_through_serde() {
        let ev: Event = serde_json::from_str(r#"{"event":"error","error":{"message":"m"}}"#).unwrap();
        assert_eq!(
            ev.kind,
            EventKind::Error(ErrorDetails {
                message: Some("m".to_owned()),
                stack: None,
            })
        );
    }

    #[test]
    fn builder_helpers() {
        let ev = Event::new(EventKind::Log { data: None })
            .timestamp(5)
            .tags(["a", "b"]);
        assert_eq!(ev.name, "log");
        assert_eq!(ev.timestamp, Some(5));
        assert_eq!(ev.tags, ["a", "b"]);
    }
}
