//! Process Messages
//!
//! The unit of exchange between the two processes: a named message
//! carrying an ordered argument list, delivered one-directionally and
//! handled asynchronously on receipt. The transport itself is a
//! primitive; this module only defines the seam.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::value::ListValue;

/// Host -> renderer: deliver a call result to the stored callback.
pub const INVOKE_CALLBACK: &str = "@invokeCallback";
/// Renderer -> host: a persistent callback finished running.
pub const CALLBACK_COMPLETED: &str = "@callbackCompleted";
/// Host -> renderer: surface a native error as a script exception.
pub const THROW_EXCEPTION: &str = "@throwException";

static RESERVED_MESSAGE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [INVOKE_CALLBACK, CALLBACK_COMPLETED, THROW_EXCEPTION]
        .into_iter()
        .collect()
});

/// Whether a function name collides with a reserved protocol message.
pub fn is_reserved_message_name(name: &str) -> bool {
    RESERVED_MESSAGE_NAMES.contains(name)
}

/// A named message with an ordered argument list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessMessage {
    pub name: String,
    pub args: ListValue,
}

impl ProcessMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: ListValue::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: ListValue) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// JSON framing for transports that carry bytes.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// One-directional message delivery into the opposite process.
///
/// Implementations are fire-and-forget: delivery failures are logged and
/// never surfaced to the protocol handlers.
pub trait MessageSender {
    fn send_message(&self, message: ProcessMessage);
}
