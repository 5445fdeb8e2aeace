//! Text Frame Codec
//!
//! Routes inbound text frames to their message kind. The feed multiplexes
//! three kinds of text messages over one socket, discriminated by a `type`
//! field: order postbacks, human-readable notices, and server-sent errors.

use thiserror::Error;

use super::messages::{Postback, TextMessage};

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is not a JSON object or is missing required fields.
    #[error("malformed text frame: {0}")]
    MalformedText(String),

    /// The `type` discriminator is not one the feed defines.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

/// Codec for the feed's JSON text frames.
#[derive(Debug, Default, Clone)]
pub struct TextCodec;

impl TextCodec {
    /// Create a new text codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode an inbound text frame into its routed message.
    ///
    /// # Errors
    ///
    /// - [`CodecError::MalformedText`] if the frame is not a JSON object or
    ///   has no string `type` field.
    /// - [`CodecError::UnknownMessageType`] if `type` is not one of
    ///   `order`, `message`, `error`.
    /// - [`CodecError::Json`] if an order postback's `data` does not parse.
    pub fn decode(&self, text: &str) -> Result<TextMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CodecError::MalformedText(e.to_string()))?;

        let Some(object) = value.as_object() else {
            return Err(CodecError::MalformedText(
                "expected a JSON object".to_string(),
            ));
        };

        let Some(kind) = object.get("type").and_then(serde_json::Value::as_str) else {
            return Err(CodecError::MalformedText(
                "missing string \"type\" field".to_string(),
            ));
        };

        match kind {
            "order" => {
                let Some(data) = object.get("data") else {
                    return Err(CodecError::MalformedText(
                        "order frame missing \"data\"".to_string(),
                    ));
                };
                let postback: Postback = serde_json::from_value(data.clone())?;
                Ok(TextMessage::Order(Box::new(postback)))
            }
            "message" => Ok(TextMessage::Notice(text.to_string())),
            "error" => {
                let data = object
                    .get("data")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(TextMessage::Error(data))
            }
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }
}
