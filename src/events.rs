// src/events.rs

use std::sync::Mutex;

use serde::Serialize;

/// Discrete notifications the controllers emit for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Signal {
    CommentAdded,
    CommentUpdated,
    /// Carries the deleted comment's id so observers can fix reply counts.
    CommentDeleted(i64),
    ReactionToggled,
    Success(String),
    Error(String),
}

/// Receiver of controller signals.
pub trait SignalSink: Send + Sync {
    fn emit(&self, signal: Signal);
}

/// Collects signals in memory. HTTP handlers return them with the response.
#[derive(Debug, Default)]
pub struct SignalBuffer {
    signals: Mutex<Vec<Signal>>,
}

impl SignalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes everything emitted so far.
    pub fn drain(&self) -> Vec<Signal> {
        match self.signals.lock() {
            Ok(mut signals) => std::mem::take(&mut *signals),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl SignalSink for SignalBuffer {
    fn emit(&self, signal: Signal) {
        tracing::debug!(?signal, "signal emitted");
        match self.signals.lock() {
            Ok(mut signals) => signals.push(signal),
            Err(poisoned) => poisoned.into_inner().push(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_drains_in_order() {
        let buffer = SignalBuffer::new();
        buffer.emit(Signal::CommentAdded);
        buffer.emit(Signal::Success("ok".into()));

        assert_eq!(
            buffer.drain(),
            vec![Signal::CommentAdded, Signal::Success("ok".into())]
        );
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn signals_serialize_with_event_names() {
        let json = serde_json::to_value(Signal::CommentDeleted(5)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "event": "commentDeleted", "data": 5 }));
    }
}
