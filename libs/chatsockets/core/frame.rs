//! Frame codec
//!
//! A frame is `OPCODE` (exactly four characters) immediately followed by a
//! JSON document, with no separator:
//!
//! ```text
//! LOGI{"key":"abc","user_id":"42"}
//! PING{"id":17,"ts":1700000000000}
//! ```
//!
//! Outbound frames are terminated with `\n`; inbound frames may or may not
//! carry trailing whitespace.

use crate::error::{Result, SocketError};
use serde_json::Value;
use std::fmt;

/// Opcode width in characters
pub const OPCODE_LEN: usize = 4;

/// Frame purpose
///
/// Known opcodes get their own variant so dispatch is an exhaustive `match`;
/// everything else is kept verbatim in `Other`. Only [`Opcode::parse`]
/// produces `Other`, so every opcode is exactly [`OPCODE_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Handshake acknowledgement carrying the session key
    Logi,
    /// Server keepalive probe
    Ping,
    /// Client keepalive answer
    Pong,
    /// Chat message
    Mesg,
    /// Channel/system event
    Syev,
    /// Any other 4-character code
    Other(UnknownOpcode),
}

/// A 4-character opcode outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownOpcode(String);

impl UnknownOpcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Opcode {
    /// # Errors
    /// `SocketError::MalformedFrame` unless `code` is exactly
    /// [`OPCODE_LEN`] characters.
    pub fn parse(code: &str) -> Result<Self> {
        let len = code.chars().count();
        if len != OPCODE_LEN {
            return Err(SocketError::MalformedFrame(format!(
                "opcode {:?} has {} characters, expected {}",
                code, len, OPCODE_LEN
            )));
        }

        Ok(match code {
            "LOGI" => Self::Logi,
            "PING" => Self::Ping,
            "PONG" => Self::Pong,
            "MESG" => Self::Mesg,
            "SYEV" => Self::Syev,
            other => Self::Other(UnknownOpcode(other.to_string())),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Logi => "LOGI",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Mesg => "MESG",
            Self::Syev => "SYEV",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of the chat wire protocol
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Value,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: Value) -> Self {
        Self { opcode, payload }
    }

    /// Split raw inbound text into opcode and JSON payload
    ///
    /// # Errors
    /// `SocketError::MalformedFrame` when the text is shorter than an opcode
    /// plus payload, or the payload is not valid JSON.
    pub fn decode(raw: &str) -> Result<Self> {
        let split = raw
            .char_indices()
            .nth(OPCODE_LEN)
            .map(|(index, _)| index)
            .ok_or_else(|| {
                SocketError::MalformedFrame(format!(
                    "expected {} character opcode followed by JSON, got {} bytes",
                    OPCODE_LEN,
                    raw.len()
                ))
            })?;

        let (code, body) = raw.split_at(split);
        let payload = serde_json::from_str(body.trim_end()).map_err(|e| {
            SocketError::MalformedFrame(format!("{} payload is not JSON: {}", code, e))
        })?;

        Ok(Self {
            opcode: Opcode::parse(code)?,
            payload,
        })
    }

    /// Serialize to wire text: opcode, compact JSON, newline
    pub fn encode(&self) -> String {
        encode(&self.opcode, &self.payload)
    }

    /// Fetch a string field from the payload
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Serialize an opcode and payload into a newline-terminated frame
pub fn encode(opcode: &Opcode, payload: &Value) -> String {
    format!("{}{}\n", opcode.as_str(), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_known_opcode() {
        let frame = Frame::decode(r#"LOGI{"key":"abc"}"#).unwrap();
        assert_eq!(frame.opcode, Opcode::Logi);
        assert_eq!(frame.str_field("key"), Some("abc"));
    }

    #[test]
    fn test_decode_unknown_opcode_is_kept() {
        let frame = Frame::decode(r#"READ{"req_id":"1"}"#).unwrap();
        assert_eq!(frame.opcode, Opcode::parse("READ").unwrap());
        assert!(matches!(frame.opcode, Opcode::Other(_)));
        assert_eq!(frame.opcode.as_str(), "READ");
    }

    #[test]
    fn test_parse_rejects_wrong_length_opcodes() {
        for code in ["", "PIN", "TOOLONG", "PINGS"] {
            assert!(
                matches!(Opcode::parse(code), Err(SocketError::MalformedFrame(_))),
                "{:?} should be rejected",
                code
            );
        }
        assert_eq!(Opcode::parse("PING").unwrap(), Opcode::Ping);
        assert_eq!(Opcode::parse("ÄÖÜß").unwrap().as_str(), "ÄÖÜß");
    }

    #[test]
    fn test_encoded_unknown_opcode_keeps_framing() {
        let frame = Frame::new(Opcode::parse("READ").unwrap(), json!({"req_id": "1"}));
        let again = Frame::decode(&frame.encode()).unwrap();

        assert_eq!(again, frame);
        assert_eq!(&frame.encode()[..OPCODE_LEN], "READ");
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        let frame = Frame::decode("PING{\"id\":1}\n").unwrap();
        assert_eq!(frame.opcode, Opcode::Ping);
        assert_eq!(frame.payload["id"], 1);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(matches!(Frame::decode(""), Err(SocketError::MalformedFrame(_))));
        assert!(matches!(Frame::decode("PIN"), Err(SocketError::MalformedFrame(_))));
        assert!(matches!(Frame::decode("PING"), Err(SocketError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_rejects_bad_json() {
        let result = Frame::decode("MESG{not json");
        assert!(matches!(result, Err(SocketError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_counts_characters_not_bytes() {
        let frame = Frame::decode("ÄÖÜß{}").unwrap();
        assert_eq!(frame.opcode.as_str(), "ÄÖÜß");
        assert_eq!(frame.payload, json!({}));
    }

    #[test]
    fn test_encode_has_no_separator_and_newline() {
        let text = Frame::new(Opcode::Pong, json!({"id": 5})).encode();
        assert_eq!(text, "PONG{\"id\":5}\n");
    }

    #[test]
    fn test_reencode_preserves_payload() {
        let raw = r#"SYEV{"cat":10000,"channel_url":"c1","data":{"user_id":"u1"}}"#;
        let frame = Frame::decode(raw).unwrap();
        let again = Frame::decode(&frame.encode()).unwrap();

        assert_eq!(again, frame);
        assert_eq!(
            again.payload,
            json!({"data": {"user_id": "u1"}, "channel_url": "c1", "cat": 10000})
        );
    }
}
