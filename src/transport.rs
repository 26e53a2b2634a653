//! In-Process Transport
//!
//! Channel-backed [`MessageSender`] for wiring both sides of the bridge
//! together inside one process: tests, single-process harnesses, and
//! anything else that does not need a real process boundary.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::message::{MessageSender, ProcessMessage};

/// `MessageSender` backed by an mpsc channel.
#[derive(Clone)]
pub struct ChannelSender {
    label: &'static str,
    tx: Sender<ProcessMessage>,
}

impl ChannelSender {
    pub fn new(label: &'static str, tx: Sender<ProcessMessage>) -> Self {
        Self { label, tx }
    }
}

impl MessageSender for ChannelSender {
    fn send_message(&self, message: ProcessMessage) {
        log::debug!("{}: sending `{}`", self.label, message.name);
        if let Err(e) = self.tx.send(message) {
            log::warn!("{}: receiver is gone; message dropped: {}", self.label, e);
        }
    }
}

/// Creates a connected sender/receiver pair. The label shows up in logs
/// to tell the two directions apart.
pub fn channel(label: &'static str) -> (ChannelSender, Receiver<ProcessMessage>) {
    let (tx, rx) = mpsc::channel();
    (ChannelSender::new(label, tx), rx)
}
