//! Renderer-Side Protocol Driver
//!
//! Owns the call-site descriptors and the pending-callback table, and
//! handles the result/exception messages arriving from the host. This is
//! where a script call turns into a message and where, much later, the
//! matching result re-enters the originating execution context.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{ERR_UNKNOWN, NO_ERROR, RegistrationError};
use crate::message::{
    self, CALLBACK_COMPLETED, INVOKE_CALLBACK, ProcessMessage, THROW_EXCEPTION,
};
use crate::value::{ListValue, Value};

use super::context::{ExecutionContext, ScriptException};
use super::script::{ScriptFunction, ScriptValue, script_args};
use super::shim;

/// Declaration of a registered function as seen from the call site.
pub struct FunctionDecl {
    pub arg_names: Vec<String>,
    /// Adds the implicit trailing `callback` parameter to the generated
    /// script signature.
    pub returns_value: bool,
    /// The callback may fire more than once per call.
    pub persistent: bool,
    /// Verbatim replacement for the default forwarding body.
    pub custom_body: Option<String>,
}

impl FunctionDecl {
    /// A function that reports a result through a one-shot callback.
    pub fn with_result(arg_names: &[&str]) -> Self {
        Self {
            arg_names: arg_names.iter().map(|s| s.to_string()).collect(),
            returns_value: true,
            persistent: false,
            custom_body: None,
        }
    }

    /// A fire-and-forget procedure: no result callback.
    pub fn procedure(arg_names: &[&str]) -> Self {
        Self {
            returns_value: false,
            ..Self::with_result(arg_names)
        }
    }

    /// A persistent event subscription: the callback may fire repeatedly.
    pub fn event(arg_names: &[&str]) -> Self {
        Self {
            returns_value: false,
            persistent: true,
            ..Self::with_result(arg_names)
        }
    }

    pub fn with_custom_body(mut self, body: impl Into<String>) -> Self {
        self.custom_body = Some(body.into());
        self
    }
}

struct FunctionDescriptor {
    persistent: bool,
}

/// Caller-side state for one in-flight call: the context it came from
/// and the completion callback, if the call supplied one.
struct PendingCallback {
    context: ExecutionContext,
    function: Option<ScriptFunction>,
}

/// Render-process side of the bridge.
///
/// Call identifiers are scoped to one proxy instance (one renderer), so
/// separate tabs never collide. All access must stay on the renderer's
/// script thread.
#[derive(Default)]
pub struct FunctionProxy {
    descriptors: BTreeMap<String, FunctionDescriptor>,
    pending: BTreeMap<i32, PendingCallback>,
    script_code: String,
    next_call_id: i32,
}

impl FunctionProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call-site descriptor and generates its script shim.
    ///
    /// Reserved protocol message names are rejected. Re-registering an
    /// existing name silently replaces the previous descriptor.
    pub fn register_function(
        &mut self,
        name: &str,
        decl: FunctionDecl,
    ) -> Result<(), RegistrationError> {
        if message::is_reserved_message_name(name) {
            return Err(RegistrationError::ReservedName(name.to_string()));
        }

        let wants_callback = decl.returns_value || decl.persistent;
        let arg_list = shim::format_arg_list(&decl.arg_names, wants_callback);
        self.script_code
            .push_str(&shim::format_function(name, &arg_list, decl.custom_body.as_deref()));

        let descriptor = FunctionDescriptor {
            persistent: decl.persistent,
        };
        if self.descriptors.insert(name.to_string(), descriptor).is_some() {
            log::warn!("function `{}` was already declared; replacing", name);
        }
        Ok(())
    }

    /// The script source to evaluate in each new execution context; it
    /// defines `app.<name>` for every registered function.
    pub fn script_code(&self) -> String {
        format!("{}{}", shim::SCRIPT_PRELUDE, self.script_code)
    }

    /// Dispatches a script call into the host process.
    ///
    /// When the trailing argument is callable it is taken as the
    /// completion callback and excluded from the forwarded arguments; a
    /// call with no callback still occupies a call-identifier slot.
    /// Returns `false` (silently) when the context has no attached
    /// sender.
    pub fn call(
        &mut self,
        name: &str,
        context: &ExecutionContext,
        arguments: &[ScriptValue],
    ) -> bool {
        let Some(sender) = context.sender() else {
            return false;
        };

        let (callback, forwarded) = match arguments.split_last() {
            Some((ScriptValue::Function(function), rest)) => (Some(Rc::clone(function)), rest),
            _ => (None, arguments),
        };

        // a call identifier must never collide with one still in flight
        while self.pending.contains_key(&self.next_call_id) {
            self.advance_call_id();
        }
        let call_id = self.next_call_id;

        let mut args = ListValue::new();
        args.set(0, Value::Int(call_id));
        for (i, argument) in forwarded.iter().enumerate() {
            args.set(i + 1, argument.to_value());
        }

        // record before sending: in a single-process harness the
        // response can arrive before send_message returns
        self.pending.insert(
            call_id,
            PendingCallback {
                context: context.clone(),
                function: callback,
            },
        );

        log::debug!("dispatching call `{}` with id {}", name, call_id);
        sender.send_message(ProcessMessage::with_args(name, args));

        self.advance_call_id();
        true
    }

    /// Handles a message arriving from the host process. Returns whether
    /// the message was recognized.
    pub fn handle_message(&mut self, message: &ProcessMessage) -> bool {
        match message.name.as_str() {
            INVOKE_CALLBACK => {
                self.on_invoke_callback(&message.args);
                true
            }
            THROW_EXCEPTION => {
                self.on_throw_exception(&message.args);
                true
            }
            _ => false,
        }
    }

    /// Removes every pending callback owned by a context being torn
    /// down, without invoking it.
    pub fn on_context_released(&mut self, context: &ExecutionContext) {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| !pending.context.is_same(context));
        let removed = before - self.pending.len();
        if removed > 0 {
            log::debug!("released {} pending callback(s) with their context", removed);
        }
    }

    /// Number of calls currently awaiting a result.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // Arguments: 0 = call id, 1 = function name, 2 = status,
    // 3.. = callback arguments.
    fn on_invoke_callback(&mut self, args: &ListValue) {
        let call_id = args.get_int(0).unwrap_or(0);
        let Some(name) = args.get_str(1) else {
            return;
        };
        let status = args.get_int(2).unwrap_or(NO_ERROR);
        let persistent = self.is_persistent(name);

        let Some(pending) = self.pending.get(&call_id) else {
            log::debug!("no pending callback for id {}; dropping result", call_id);
            return;
        };

        // skip stale targets: the document is gone
        if let Some(sender) = pending.context.sender() {
            if status == NO_ERROR {
                if let Some(function) = &pending.function {
                    log::debug!("invoking callback for `{}` (id {})", name, call_id);
                    let callback_args = script_args(args, 3);
                    function(&pending.context, &callback_args);

                    // acknowledge persistent callbacks so the host can
                    // track round completion
                    if persistent {
                        let mut ack = ListValue::new();
                        ack.set(0, Value::Int(call_id));
                        ack.set(1, Value::String(name.to_string()));
                        sender.send_message(ProcessMessage::with_args(CALLBACK_COMPLETED, ack));
                    }
                }
            } else {
                pending
                    .context
                    .throw(ScriptException::from_status(name, status));
            }
        }

        // persistent entries stay so the callback can fire again
        if !persistent {
            self.pending.remove(&call_id);
        }
    }

    // Arguments: 0 = call id, 1 = function name, 2 = status.
    fn on_throw_exception(&mut self, args: &ListValue) {
        let call_id = args.get_int(0).unwrap_or(0);
        let Some(name) = args.get_str(1) else {
            return;
        };
        let status = args.get_int(2).unwrap_or(ERR_UNKNOWN);
        let persistent = self.is_persistent(name);

        if let Some(pending) = self.pending.get(&call_id) {
            if pending.context.is_attached() {
                pending
                    .context
                    .throw(ScriptException::from_status(name, status));
            }
            // the exception is a terminal outcome for a one-shot call
            if !persistent {
                self.pending.remove(&call_id);
            }
        }
    }

    fn is_persistent(&self, name: &str) -> bool {
        self.descriptors
            .get(name)
            .map(|descriptor| descriptor.persistent)
            .unwrap_or(false)
    }

    // Wraps to 0 before exceeding the signed 32-bit range.
    fn advance_call_id(&mut self) {
        self.next_call_id = if self.next_call_id >= i32::MAX - 1 {
            0
        } else {
            self.next_call_id + 1
        };
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::message::MessageSender;

    #[derive(Default)]
    struct RecordingSender {
        messages: RefCell<Vec<ProcessMessage>>,
    }

    impl MessageSender for RecordingSender {
        fn send_message(&self, message: ProcessMessage) {
            self.messages.borrow_mut().push(message);
        }
    }

    fn context_with_recorder() -> (ExecutionContext, Rc<RecordingSender>) {
        let recorder = Rc::new(RecordingSender::default());
        (ExecutionContext::new(recorder.clone()), recorder)
    }

    #[test]
    fn test_register_rejects_reserved_names() {
        let mut proxy = FunctionProxy::new();
        let result = proxy.register_function("@throwException", FunctionDecl::procedure(&[]));
        assert_eq!(
            result,
            Err(RegistrationError::ReservedName("@throwException".into()))
        );
    }

    #[test]
    fn test_script_code_has_prelude_and_shims() {
        let mut proxy = FunctionProxy::new();
        proxy
            .register_function("add", FunctionDecl::with_result(&["a", "b"]))
            .unwrap();
        proxy
            .register_function("quit", FunctionDecl::procedure(&[]))
            .unwrap();

        let code = proxy.script_code();
        assert!(code.starts_with("var app; if(!app) app={};\n"));
        assert!(code.contains("app.add=function(a, b,callback){"));
        assert!(code.contains("app.quit=function(){"));
    }

    #[test]
    fn test_call_without_sender_fails_silently() {
        let mut proxy = FunctionProxy::new();
        let (context, _) = context_with_recorder();
        context.detach();
        assert!(!proxy.call("add", &context, &[ScriptValue::Int(1)]));
        assert_eq!(proxy.pending_count(), 0);
    }

    #[test]
    fn test_call_ids_increase_and_trailing_callback_is_stripped() {
        let mut proxy = FunctionProxy::new();
        let (context, recorder) = context_with_recorder();
        let callback: ScriptFunction = Rc::new(|_, _| {});

        assert!(proxy.call(
            "add",
            &context,
            &[
                ScriptValue::Int(2),
                ScriptValue::Int(3),
                ScriptValue::Function(callback),
            ],
        ));
        assert!(proxy.call("add", &context, &[ScriptValue::Int(4)]));

        let messages = recorder.messages.borrow();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].name, "add");
        assert_eq!(messages[0].args.get_int(0), Some(0));
        // the callback was excluded from the forwarded arguments
        assert_eq!(messages[0].args.len(), 3);
        assert_eq!(messages[0].args.get_int(1), Some(2));
        assert_eq!(messages[0].args.get_int(2), Some(3));
        assert_eq!(messages[1].args.get_int(0), Some(1));
        assert_eq!(proxy.pending_count(), 2);
    }

    #[test]
    fn test_call_id_wraps_before_signed_overflow() {
        let mut proxy = FunctionProxy::new();
        let (context, recorder) = context_with_recorder();

        proxy.next_call_id = i32::MAX - 1;
        assert!(proxy.call("ping", &context, &[]));
        assert_eq!(proxy.next_call_id, 0);
        assert!(proxy.call("ping", &context, &[]));

        let messages = recorder.messages.borrow();
        assert_eq!(messages[0].args.get_int(0), Some(i32::MAX - 1));
        assert_eq!(messages[1].args.get_int(0), Some(0));
    }

    #[test]
    fn test_wrapped_call_id_skips_in_flight_entries() {
        let mut proxy = FunctionProxy::new();
        let (context, recorder) = context_with_recorder();

        // id 0 is still in flight when the counter wraps around to it
        assert!(proxy.call("ping", &context, &[]));
        proxy.next_call_id = 0;
        assert!(proxy.call("ping", &context, &[]));

        let messages = recorder.messages.borrow();
        assert_eq!(messages[0].args.get_int(0), Some(0));
        assert_eq!(messages[1].args.get_int(0), Some(1));
        assert_eq!(proxy.pending_count(), 2);
    }

    #[test]
    fn test_result_for_unknown_id_has_no_effect() {
        let mut proxy = FunctionProxy::new();
        let mut args = ListValue::new();
        args.set(0, Value::Int(77));
        args.set(1, Value::String("add".into()));
        args.set(2, Value::Int(NO_ERROR));
        assert!(proxy.handle_message(&ProcessMessage::with_args(INVOKE_CALLBACK, args)));
    }

    #[test]
    fn test_exception_throws_and_removes_one_shot_pending_entry() {
        let mut proxy = FunctionProxy::new();
        proxy
            .register_function("add", FunctionDecl::with_result(&["a", "b"]))
            .unwrap();
        let (context, _) = context_with_recorder();
        assert!(proxy.call(
            "add",
            &context,
            &[ScriptValue::Int(1), ScriptValue::Int(2)],
        ));
        assert_eq!(proxy.pending_count(), 1);

        let mut args = ListValue::new();
        args.set(0, Value::Int(0));
        args.set(1, Value::String("add".into()));
        args.set(2, Value::Int(ERR_UNKNOWN));
        assert!(proxy.handle_message(&ProcessMessage::with_args(THROW_EXCEPTION, args)));

        let exceptions = context.take_exceptions();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].function, "add");
        assert_eq!(exceptions[0].status, ERR_UNKNOWN);
        // the exception was terminal: the call no longer awaits a result
        assert_eq!(proxy.pending_count(), 0);
    }

    #[test]
    fn test_exception_for_detached_context_still_clears_the_entry() {
        let mut proxy = FunctionProxy::new();
        proxy
            .register_function("add", FunctionDecl::with_result(&["a"]))
            .unwrap();
        let (context, _) = context_with_recorder();
        assert!(proxy.call("add", &context, &[ScriptValue::Int(1)]));
        context.detach();

        let mut args = ListValue::new();
        args.set(0, Value::Int(0));
        args.set(1, Value::String("add".into()));
        args.set(2, Value::Int(ERR_UNKNOWN));
        proxy.handle_message(&ProcessMessage::with_args(THROW_EXCEPTION, args));

        assert!(context.take_exceptions().is_empty());
        assert_eq!(proxy.pending_count(), 0);
    }

    #[test]
    fn test_unknown_message_is_not_handled() {
        let mut proxy = FunctionProxy::new();
        assert!(!proxy.handle_message(&ProcessMessage::new("whatever")));
    }
}
