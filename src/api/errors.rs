//! Protocol Error Handling
//!
//! Turns failures into `*-error` envelopes. Internal causes are logged and
//! never sent to the client.

use super::models::{Envelope, ErrorPayload, ERROR};
use crate::errors::CasinoError;
use thiserror::Error;
use tracing::warn;

/// Frame-level failures, before an operation runs
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
    #[error("Invalid {event} payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

impl ProtocolError {
    pub fn into_envelope(self) -> Envelope {
        warn!(error = %self, "Rejected client frame");
        match self {
            ProtocolError::MalformedFrame(_) => Envelope::new(ERROR, message("Malformed message.")),
            ProtocolError::UnknownEvent(event) => {
                Envelope::new(ERROR, message(format!("Unknown event '{}'.", event)))
            }
            ProtocolError::InvalidPayload { event, .. } => {
                Envelope::error_for(&event, format!("Invalid {} request.", event))
            }
        }
    }
}

fn message(text: impl Into<String>) -> ErrorPayload {
    ErrorPayload { message: text.into() }
}

/// `<event>-error` reply for a failed operation
pub fn operation_error(event: &str, error: &CasinoError) -> Envelope {
    warn!(event, code = error.code(), error = %error, "Operation failed");
    Envelope::error_for(event, error.client_message())
}
