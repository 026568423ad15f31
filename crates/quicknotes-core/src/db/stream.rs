//! Server-sent event parsing for Realtime Database streaming reads.

use serde::Deserialize;
use serde_json::Value;

use super::{tree, DatabaseError, DatabaseResult};

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Chunks may split lines (or
/// UTF-8 sequences) anywhere.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl EventStreamParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').map_or((line, ""), |(field, value)| {
            (field, value.strip_prefix(' ').unwrap_or(value))
        });
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        Some(ServerEvent {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Effect of a stream event on the cached tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    Updated,
    KeepAlive,
    Cancelled(String),
    AuthRevoked,
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Apply a Realtime Database stream event to `cache`.
pub fn apply_event(cache: &mut Value, event: &ServerEvent) -> DatabaseResult<StreamAction> {
    match event.event.as_str() {
        "put" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            tree::set(cache, &split_path(&payload.path), payload.data);
            Ok(StreamAction::Updated)
        }
        "patch" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            let Value::Object(children) = payload.data else {
                return Err(DatabaseError::Stream(
                    "patch event data must be an object".to_string(),
                ));
            };
            tree::update(cache, &split_path(&payload.path), children);
            Ok(StreamAction::Updated)
        }
        "keep-alive" => Ok(StreamAction::KeepAlive),
        "cancel" => Ok(StreamAction::Cancelled(
            serde_json::from_str::<Value>(&event.data)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| event.data.trim().to_string()),
        )),
        "auth_revoked" => Ok(StreamAction::AuthRevoked),
        other => Ok(StreamAction::Ignored(other.to_string())),
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn event(name: &str, data: &str) -> ServerEvent {
        ServerEvent {
            event: name.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn parser_handles_split_chunks_and_crlf() {
        let mut parser = EventStreamParser::default();
        assert!(parser.feed(b"event: put\r\nda").is_empty());
        let events = parser.feed(b"ta: {\"path\":\"/\",\"data\":null}\r\n\r\n");
        assert_eq!(events, vec![event("put", r#"{"path":"/","data":null}"#)]);
    }

    #[test]
    fn parser_joins_multiline_data_and_skips_comments() {
        let mut parser = EventStreamParser::default();
        let events = parser.feed(b": comment\nevent: patch\ndata: a\ndata: b\n\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(
            events,
            vec![event("patch", "a\nb"), event("keep-alive", "null")]
        );
    }

    #[test]
    fn parser_keeps_multibyte_text_split_across_chunks() {
        let mut parser = EventStreamParser::default();
        let payload = "event: put\ndata: \"⏰\"\n\n".as_bytes();
        let (first, second) = payload.split_at(19);
        assert!(parser.feed(first).is_empty());
        let events = parser.feed(second);
        assert_eq!(events, vec![event("put", "\"⏰\"")]);
    }

    #[test]
    fn put_and_patch_update_cache() {
        let mut cache = Value::Null;
        let action = apply_event(
            &mut cache,
            &event(
                "put",
                r#"{"path":"/","data":{"-a":{"content":"hi","checked":false}}}"#,
            ),
        )
        .unwrap();
        assert_eq!(action, StreamAction::Updated);

        apply_event(
            &mut cache,
            &event("patch", r#"{"path":"/-a","data":{"checked":true}}"#),
        )
        .unwrap();
        apply_event(
            &mut cache,
            &event("put", r#"{"path":"/-b","data":{"content":"second"}}"#),
        )
        .unwrap();
        assert_eq!(
            cache,
            json!({
                "-a": { "content": "hi", "checked": true },
                "-b": { "content": "second" }
            })
        );

        apply_event(&mut cache, &event("put", r#"{"path":"/-a","data":null}"#)).unwrap();
        assert_eq!(cache, json!({ "-b": { "content": "second" } }));
    }

    #[test]
    fn control_events_are_reported() {
        let mut cache = Value::Null;
        assert_eq!(
            apply_event(&mut cache, &event("keep-alive", "null")).unwrap(),
            StreamAction::KeepAlive
        );
        assert_eq!(
            apply_event(&mut cache, &event("cancel", "\"Permission denied\"")).unwrap(),
            StreamAction::Cancelled("Permission denied".to_string())
        );
        assert_eq!(
            apply_event(&mut cache, &event("auth_revoked", "\"token expired\"")).unwrap(),
            StreamAction::AuthRevoked
        );
    }

    #[test]
    fn malformed_patch_is_an_error() {
        let mut cache = Value::Null;
        assert!(apply_event(&mut cache, &event("patch", r#"{"path":"/","data":5}"#)).is_err());
        assert!(apply_event(&mut cache, &event("put", "not json")).is_err());
    }
}
