//! Host-Side Protocol Driver
//!
//! Owns the function registry and the pending-invocation sessions, and
//! handles the messages arriving from renderer processes: function calls
//! and completion acknowledgments for persistent callbacks.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{NO_ERROR, RegistrationError};
use crate::message::{
    self, CALLBACK_COMPLETED, INVOKE_CALLBACK, MessageSender, ProcessMessage, THROW_EXCEPTION,
};
use crate::value::{ListValue, Value};

use super::function::NativeFunction;

/// Host-process side of the bridge: the function registry plus the
/// message handlers that drive it.
///
/// All access must stay on the host's designated thread; each handler
/// runs to completion before the next message is processed.
#[derive(Default)]
pub struct FunctionHost {
    functions: BTreeMap<String, NativeFunction>,
}

impl FunctionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native function under `name`.
    ///
    /// Reserved protocol message names are rejected. Re-registering an
    /// existing name silently replaces the previous implementation.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut function: NativeFunction,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if message::is_reserved_message_name(&name) {
            return Err(RegistrationError::ReservedName(name));
        }

        function.name = name.clone();
        if self.functions.insert(name.clone(), function).is_some() {
            log::warn!("native function `{}` was already registered; replacing", name);
        }
        Ok(())
    }

    /// Handles a message arriving from a renderer. `sender` reaches back
    /// into that renderer. Returns whether the message was recognized.
    pub fn handle_message(
        &mut self,
        sender: &Rc<dyn MessageSender>,
        message: &ProcessMessage,
    ) -> bool {
        if message.name == CALLBACK_COMPLETED {
            self.on_callback_completed(&message.args);
            return true;
        }

        let Some(function) = self.functions.get_mut(&message.name) else {
            return false;
        };

        let (ret, status) = function.call(&message.args);
        let call_id = message.args.get_int(0).unwrap_or(0);

        if function.persistent {
            if status == NO_ERROR {
                // held open: the callback fires later via invoke_callbacks
                function.add_session(call_id, Rc::clone(sender));
            } else {
                let mut args = ListValue::new();
                args.set(0, Value::Int(call_id));
                args.set(1, Value::String(message.name.clone()));
                args.set(2, Value::Int(status));
                sender.send_message(ProcessMessage::with_args(THROW_EXCEPTION, args));
            }
        } else {
            // one-shot: respond immediately, carrying the status inline
            let mut args = ListValue::new();
            args.set(0, Value::Int(call_id));
            args.set(1, Value::String(message.name.clone()));
            args.set(2, Value::Int(status));
            ret.copy_into(&mut args, 3);
            sender.send_message(ProcessMessage::with_args(INVOKE_CALLBACK, args));
        }

        true
    }

    /// Fires every recorded session of `function_name` with `args`,
    /// through each session's own sender. Returns whether any callback
    /// was invoked.
    ///
    /// This is how native events reach persistent script listeners, and
    /// how implementations that deferred their work deliver late results.
    pub fn invoke_callbacks(&self, function_name: &str, args: &ListValue) -> bool {
        let Some(function) = self.functions.get(function_name) else {
            return false;
        };

        let mut invoked = false;
        for session in &function.sessions {
            let mut response = ListValue::new();
            response.set(0, Value::Int(session.call_id));
            response.set(1, Value::String(function_name.to_string()));
            response.set(2, Value::Int(NO_ERROR));
            args.copy_into(&mut response, 3);
            session
                .sender
                .send_message(ProcessMessage::with_args(INVOKE_CALLBACK, response));
            invoked = true;
        }

        invoked
    }

    /// Drops every callback session recorded for `function_name`.
    ///
    /// Sessions are otherwise kept for the life of the process; the
    /// embedder calls this when it learns the owning renderer is gone.
    pub fn clear_sessions(&mut self, function_name: &str) {
        if let Some(function) = self.functions.get_mut(function_name) {
            function.sessions.clear();
        }
    }

    pub fn clear_all_sessions(&mut self) {
        for function in self.functions.values_mut() {
            function.sessions.clear();
        }
    }

    pub fn session_count(&self, function_name: &str) -> usize {
        self.functions
            .get(function_name)
            .map(|function| function.sessions.len())
            .unwrap_or(0)
    }

    // A script callback of a persistent function reported completion.
    // Arguments: 0 = call id, 1 = function name.
    fn on_callback_completed(&mut self, args: &ListValue) {
        let call_id = args.get_int(0).unwrap_or(0);
        let Some(name) = args.get_str(1) else {
            return;
        };
        // nothing to do if the function is unknown
        let Some(function) = self.functions.get_mut(name) else {
            return;
        };

        let mut round = None;
        for session in &mut function.sessions {
            if session.call_id == call_id {
                session.completed_count += 1;
                round = Some(session.completed_count);
                break;
            }
        }
        let Some(round) = round else {
            // stale ack for a session that no longer exists
            return;
        };

        if function.all_callbacks_completed.is_some()
            && function
                .sessions
                .iter()
                .all(|session| session.completed_count >= round)
        {
            log::debug!("all callbacks of `{}` completed round {}", name, round);
            if let Some(hook) = function.all_callbacks_completed.as_mut() {
                hook();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::ERR_INVALID_PARAM_NUM;
    use crate::value::ValueType;

    #[derive(Default)]
    struct RecordingSender {
        messages: RefCell<Vec<ProcessMessage>>,
    }

    impl MessageSender for RecordingSender {
        fn send_message(&self, message: ProcessMessage) {
            self.messages.borrow_mut().push(message);
        }
    }

    fn call_message(name: &str, call_id: i32, args: Vec<Value>) -> ProcessMessage {
        let mut list = ListValue::new();
        list.set(0, Value::Int(call_id));
        for (i, value) in args.into_iter().enumerate() {
            list.set(i + 1, value);
        }
        ProcessMessage::with_args(name, list)
    }

    #[test]
    fn test_register_rejects_reserved_names() {
        let mut host = FunctionHost::new();
        let result = host.register(
            "@invokeCallback",
            NativeFunction::builder(|_, _| NO_ERROR).build(),
        );
        assert_eq!(
            result,
            Err(RegistrationError::ReservedName("@invokeCallback".into()))
        );
    }

    #[test]
    fn test_unknown_message_is_not_handled() {
        let mut host = FunctionHost::new();
        let sender: Rc<dyn MessageSender> = Rc::new(RecordingSender::default());
        let handled = host.handle_message(&sender, &call_message("nope", 0, vec![]));
        assert!(!handled);
    }

    #[test]
    fn test_one_shot_response_carries_status_and_results() {
        let mut host = FunctionHost::new();
        host.register(
            "double",
            NativeFunction::builder(|args, ret| {
                ret.push(Value::Int(args.get_int(0).unwrap_or(0) * 2));
                NO_ERROR
            })
            .arg(ValueType::Int, "n")
            .build(),
        )
        .unwrap();

        let recording = Rc::new(RecordingSender::default());
        let sender: Rc<dyn MessageSender> = recording.clone();
        assert!(host.handle_message(&sender, &call_message("double", 9, vec![Value::Int(21)])));

        let messages = recording.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, INVOKE_CALLBACK);
        assert_eq!(messages[0].args.get_int(0), Some(9));
        assert_eq!(messages[0].args.get_str(1), Some("double"));
        assert_eq!(messages[0].args.get_int(2), Some(NO_ERROR));
        assert_eq!(messages[0].args.get_int(3), Some(42));
    }

    #[test]
    fn test_one_shot_error_still_responds_inline() {
        let mut host = FunctionHost::new();
        host.register(
            "strict",
            NativeFunction::builder(|_, _| NO_ERROR)
                .arg(ValueType::Int, "n")
                .build(),
        )
        .unwrap();

        let recording = Rc::new(RecordingSender::default());
        let sender: Rc<dyn MessageSender> = recording.clone();
        // missing the declared argument entirely
        host.handle_message(&sender, &call_message("strict", 1, vec![]));

        let messages = recording.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, INVOKE_CALLBACK);
        assert_eq!(messages[0].args.get_int(2), Some(ERR_INVALID_PARAM_NUM));
    }

    #[test]
    fn test_persistent_success_holds_the_call_open() {
        let mut host = FunctionHost::new();
        host.register(
            "watch",
            NativeFunction::builder(|_, _| NO_ERROR).persistent().build(),
        )
        .unwrap();

        let recording = Rc::new(RecordingSender::default());
        let sender: Rc<dyn MessageSender> = recording.clone();
        host.handle_message(&sender, &call_message("watch", 4, vec![]));

        assert!(recording.messages.borrow().is_empty());
        assert_eq!(host.session_count("watch"), 1);
    }

    #[test]
    fn test_persistent_failure_throws() {
        let mut host = FunctionHost::new();
        host.register(
            "watch",
            NativeFunction::builder(|_, _| 7).persistent().build(),
        )
        .unwrap();

        let recording = Rc::new(RecordingSender::default());
        let sender: Rc<dyn MessageSender> = recording.clone();
        host.handle_message(&sender, &call_message("watch", 4, vec![]));

        let messages = recording.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, THROW_EXCEPTION);
        assert_eq!(messages[0].args.get_int(0), Some(4));
        assert_eq!(messages[0].args.get_str(1), Some("watch"));
        assert_eq!(messages[0].args.get_int(2), Some(7));
        assert_eq!(host.session_count("watch"), 0);
    }

    #[test]
    fn test_completion_ack_for_unknown_function_is_a_no_op() {
        let mut host = FunctionHost::new();
        let sender: Rc<dyn MessageSender> = Rc::new(RecordingSender::default());
        let mut args = ListValue::new();
        args.set(0, Value::Int(3));
        args.set(1, Value::String("ghost".into()));
        let handled =
            host.handle_message(&sender, &ProcessMessage::with_args(CALLBACK_COMPLETED, args));
        assert!(handled);
    }
}
