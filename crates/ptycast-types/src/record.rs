//! The append-only recording line format.
//!
//! Each recorded event is one JSON array per line, `[time, channel, data]`,
//! UTF-8, newline-terminated. String escaping is whatever `serde_json`
//! produces; the recording writer and the prune byte-offset math both go
//! through this type so the two can never disagree.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Channel for terminal output events.
pub const OUTPUT_CHANNEL: &str = "o";
/// Channel for user input events.
pub const INPUT_CHANNEL: &str = "i";
/// Channel for terminal resize events.
pub const RESIZE_CHANNEL: &str = "r";

/// A single recorded event: `[time, channel, data]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Seconds since the start of the recording.
    pub time: f64,
    /// Event channel ("o" output, "i" input, "r" resize).
    pub channel: String,
    /// Event payload (raw terminal text for "o" events).
    pub data: String,
}

impl RecordedEvent {
    /// Create an output event.
    pub fn output(time: f64, data: impl Into<String>) -> Self {
        Self {
            time,
            channel: OUTPUT_CHANNEL.to_string(),
            data: data.into(),
        }
    }
}

impl Serialize for RecordedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.time)?;
        tup.serialize_element(&self.channel)?;
        tup.serialize_element(&self.data)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for RecordedEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EventVisitor;

        impl<'de> Visitor<'de> for EventVisitor {
            type Value = RecordedEvent;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [time, channel, data] array")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let time = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let channel = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let data = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                // Reject trailing elements so malformed lines are caught.
                if seq.next_element::<serde_json::Value>()?.is_some() {
                    return Err(de::Error::custom("event array has more than 3 elements"));
                }
                Ok(RecordedEvent {
                    time,
                    channel,
                    data,
                })
            }
        }

        deserializer.deserialize_seq(EventVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_json_array() {
        let event = RecordedEvent::output(1.5, "hello");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"[1.5,"o","hello"]"#);
    }

    #[test]
    fn test_round_trip_with_escapes() {
        let event = RecordedEvent::output(0.25, "line\n\x1b[2J\"quoted\"");
        let json = serde_json::to_string(&event).unwrap();
        let back: RecordedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        assert!(serde_json::from_str::<RecordedEvent>(r#"[1.0,"o"]"#).is_err());
        assert!(serde_json::from_str::<RecordedEvent>(r#"[1.0,"o","x","y"]"#).is_err());
        assert!(serde_json::from_str::<RecordedEvent>(r#"{"time":1.0}"#).is_err());
    }
}
