//! Watch events and the newline-delimited stream framing.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::Unit;

/// Type tag carried by every watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    /// The object was created (or first seen by this watch).
    Added,
    Modified,
    Deleted,
    /// Progress marker without object changes.
    Bookmark,
    /// The server reported a watch-level error; `object` is a status.
    Error,
    #[serde(other)]
    Unknown,
}

impl WatchEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventType::Added => "ADDED",
            WatchEventType::Modified => "MODIFIED",
            WatchEventType::Deleted => "DELETED",
            WatchEventType::Bookmark => "BOOKMARK",
            WatchEventType::Error => "ERROR",
            WatchEventType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event delivered by a watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,

    #[serde(default)]
    pub object: serde_json::Value,
}

impl WatchEvent {
    pub fn new(event_type: WatchEventType, unit: &Unit) -> Self {
        Self {
            event_type,
            // Serializing plain data structs into a Value cannot fail.
            object: serde_json::to_value(unit).unwrap_or_default(),
        }
    }

    /// Created-event for `unit`.
    pub fn added(unit: &Unit) -> Self {
        Self::new(WatchEventType::Added, unit)
    }

    pub fn deleted(unit: &Unit) -> Self {
        Self::new(WatchEventType::Deleted, unit)
    }

    /// Decode one framed line of a watch response.
    pub fn decode_line(line: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(line).map_err(|e| ApiError::InvalidWatchEvent(e.to_string()))
    }

    /// Returns true if this event announces a newly created object.
    pub fn is_created(&self) -> bool {
        self.event_type == WatchEventType::Added
    }

    /// Decode the carried object as a unit.
    pub fn unit(&self) -> Result<Unit, ApiError> {
        Unit::from_value(self.object.clone())
    }
}

/// Reassembles newline-delimited frames from arbitrarily split chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete, non-blank line (without its terminator).
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let pos = self.buf.iter().position(|b| *b == b'\n')?;
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !is_blank(&line) {
                return Some(line);
            }
        }
    }

    /// Flush a trailing unterminated line once the stream has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buf);
        (!is_blank(&rest)).then_some(rest)
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_added_event() {
        let line = serde_json::json!({
            "type": "ADDED",
            "object": {
                "metadata": {"name": "web-1", "namespace": "default", "uid": "u-1"},
                "spec": {"schedulerName": "random-scheduler"}
            }
        })
        .to_string();
        let event = WatchEvent::decode_line(line.as_bytes()).unwrap();

        assert!(event.is_created());
        let unit = event.unit().unwrap();
        assert_eq!(unit.key(), "default/web-1");
    }

    #[test]
    fn test_unknown_event_type_is_tolerated() {
        let event = WatchEvent::decode_line(br#"{"type":"SOMETHING_NEW","object":{}}"#).unwrap();
        assert_eq!(event.event_type, WatchEventType::Unknown);
        assert!(!event.is_created());
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let err = WatchEvent::decode_line(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::InvalidWatchEvent(_)));
    }

    #[test]
    fn test_event_round_trips_through_unit() {
        let unit = Unit::new("default", "web-1", "u-1", "random-scheduler");
        let event = WatchEvent::deleted(&unit);
        assert_eq!(event.event_type.to_string(), "DELETED");
        assert_eq!(event.unit().unwrap(), unit);
    }

    #[test]
    fn test_line_decoder_reassembles_split_chunks() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"a\":");
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"1}\n\n{\"b\":2}\r\n{\"c\"");
        assert_eq!(decoder.next_line().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(decoder.next_line().as_deref(), Some(&b"{\"b\":2}"[..]));
        assert_eq!(decoder.next_line(), None);

        assert_eq!(decoder.finish().as_deref(), Some(&b"{\"c\""[..]));
        assert_eq!(decoder.finish(), None);
    }

    proptest! {
        #[test]
        fn prop_line_decoder_is_split_invariant(
            lines in proptest::collection::vec("[a-z0-9]{1,12}", 1..8),
            split in 0usize..64,
        ) {
            let joined: Vec<u8> = lines
                .iter()
                .flat_map(|l| format!("{l}\n").into_bytes())
                .collect();
            let split = split.min(joined.len());

            let mut decoder = LineDecoder::new();
            decoder.push(&joined[..split]);
            let mut out = Vec::new();
            while let Some(line) = decoder.next_line() {
                out.push(line);
            }
            decoder.push(&joined[split..]);
            while let Some(line) = decoder.next_line() {
                out.push(line);
            }

            let expected: Vec<Vec<u8>> = lines.iter().map(|l| l.clone().into_bytes()).collect();
            prop_assert_eq!(out, expected);
        }
    }
}
