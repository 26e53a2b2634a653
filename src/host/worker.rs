//! Host Worker Thread
//!
//! All host tables are confined to one designated thread. This worker
//! owns a [`FunctionHost`] on a dedicated thread and feeds it messages
//! from a command channel; renderers and native code on other threads
//! only ever post to it.

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::message::{MessageSender, ProcessMessage};
use crate::value::ListValue;

use super::FunctionHost;

/// Commands accepted by the host worker thread.
#[derive(Debug)]
pub enum HostCommand {
    /// A protocol message from a renderer.
    Message(ProcessMessage),
    /// Fire the callback sessions of a persistent function with the
    /// given arguments (posted by native code, e.g. after deferred work).
    InvokeCallbacks {
        function_name: String,
        args: ListValue,
    },
    /// Stop the worker loop.
    Shutdown,
}

/// Clonable handle delivering messages to the worker thread.
///
/// Implements [`MessageSender`], so a renderer can use it directly as
/// its peer.
#[derive(Clone)]
pub struct HostClient {
    sender: Sender<HostCommand>,
}

impl HostClient {
    /// Posts a persistent-callback invocation from any thread.
    pub fn invoke_callbacks(&self, function_name: impl Into<String>, args: ListValue) {
        let command = HostCommand::InvokeCallbacks {
            function_name: function_name.into(),
            args,
        };
        if let Err(e) = self.sender.send(command) {
            log::warn!("host worker is gone; dropping callback invocation: {}", e);
        }
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(HostCommand::Shutdown);
    }
}

impl MessageSender for HostClient {
    fn send_message(&self, message: ProcessMessage) {
        if let Err(e) = self.sender.send(HostCommand::Message(message)) {
            log::warn!("host worker is gone; dropping message: {}", e);
        }
    }
}

/// Host side running on its own designated thread.
pub struct HostWorker {
    client: HostClient,
    handle: JoinHandle<()>,
}

impl HostWorker {
    /// Spawns the worker. The [`FunctionHost`] is constructed inside the
    /// thread (its session table is not `Send`); responses go out
    /// through `reply`.
    pub fn spawn<F>(reply: impl MessageSender + Send + 'static, build: F) -> Self
    where
        F: FnOnce() -> FunctionHost + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || run_host_loop(receiver, build(), reply));
        Self {
            client: HostClient { sender },
            handle,
        }
    }

    /// A handle for posting to the worker; cheap to clone.
    pub fn client(&self) -> HostClient {
        self.client.clone()
    }

    /// Stops the worker after it drains already-queued commands.
    pub fn shutdown(self) {
        self.client.shutdown();
        if self.handle.join().is_err() {
            log::error!("host worker thread panicked");
        }
    }
}

fn run_host_loop(
    receiver: Receiver<HostCommand>,
    mut host: FunctionHost,
    reply: impl MessageSender + 'static,
) {
    log::info!("host worker started");
    let reply: Rc<dyn MessageSender> = Rc::new(reply);

    loop {
        match receiver.recv() {
            Ok(HostCommand::Message(message)) => {
                if !host.handle_message(&reply, &message) {
                    log::debug!("unhandled message `{}`", message.name);
                }
            }
            Ok(HostCommand::InvokeCallbacks {
                function_name,
                args,
            }) => {
                host.invoke_callbacks(&function_name, &args);
            }
            Ok(HostCommand::Shutdown) => {
                log::info!("host worker shutting down");
                break;
            }
            Err(e) => {
                log::error!("host worker channel error: {}", e);
                break;
            }
        }
    }

    log::info!("host worker stopped");
}
