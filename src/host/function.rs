//! Native Function Signatures
//!
//! A registered function owns its typed argument signature, its native
//! implementation, and (for persistent functions) the callback sessions
//! currently held open against it.

use std::rc::Rc;

use crate::error::{ERR_INVALID_PARAM_NUM, ERR_INVALID_PARAM_TYPES};
use crate::message::MessageSender;
use crate::value::{ListValue, ValueType};

/// Native implementation of a registered function.
///
/// Receives the call arguments (call identifier already stripped) and an
/// empty result list to populate; returns a status code, `NO_ERROR` for
/// success.
pub type NativeFn = Box<dyn Fn(&ListValue, &mut ListValue) -> i32 + Send>;

/// Hook invoked once every outstanding callback session of a persistent
/// function has acknowledged completion of the current round.
pub type CallbacksCompletedFn = Box<dyn FnMut() + Send>;

/// One outstanding invocation of a persistent function: the call id it
/// was recorded under, the sender reaching its renderer, and how many
/// times its script callback has reported completion.
pub(crate) struct CallbackSession {
    pub call_id: i32,
    pub sender: Rc<dyn MessageSender>,
    pub completed_count: i32,
}

/// A native function callable from script.
pub struct NativeFunction {
    pub(crate) name: String,
    func: NativeFn,
    arg_types: Vec<ValueType>,
    arg_names: Vec<String>,
    pub(crate) persistent: bool,
    pub(crate) all_callbacks_completed: Option<CallbacksCompletedFn>,
    pub(crate) sessions: Vec<CallbackSession>,
}

impl NativeFunction {
    pub fn builder(
        func: impl Fn(&ListValue, &mut ListValue) -> i32 + Send + 'static,
    ) -> NativeFunctionBuilder {
        NativeFunctionBuilder {
            func: Box::new(func),
            args: Vec::new(),
            persistent: false,
            all_callbacks_completed: None,
        }
    }

    /// Validates the raw arguments and invokes the implementation.
    ///
    /// Element 0 of `raw_args` is the call identifier; the declared
    /// arguments start at element 1. The implementation receives a fresh
    /// copy with the identifier stripped.
    pub(crate) fn call(&self, raw_args: &ListValue) -> (ListValue, i32) {
        log::debug!("invoking native function `{}`", self.name);

        if raw_args.len() != self.arg_types.len() + 1 {
            return (ListValue::new(), ERR_INVALID_PARAM_NUM);
        }

        for (i, arg_type) in self.arg_types.iter().enumerate() {
            let accepted = raw_args
                .get(i + 1)
                .map(|value| arg_type.accepts(value))
                .unwrap_or(false);
            if !accepted {
                return (ListValue::new(), ERR_INVALID_PARAM_TYPES);
            }
        }

        let mut fn_args = ListValue::new();
        raw_args.copy_into(&mut fn_args, -1);

        let mut ret = ListValue::new();
        let status = (self.func)(&fn_args, &mut ret);
        (ret, status)
    }

    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Comma-separated declared argument names.
    pub fn arg_list(&self) -> String {
        self.arg_names.join(", ")
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub(crate) fn add_session(&mut self, call_id: i32, sender: Rc<dyn MessageSender>) {
        self.sessions.push(CallbackSession {
            call_id,
            sender,
            completed_count: 0,
        });
    }
}

/// Builds a [`NativeFunction`] from an ordered list of typed-argument
/// descriptors.
pub struct NativeFunctionBuilder {
    func: NativeFn,
    args: Vec<(ValueType, String)>,
    persistent: bool,
    all_callbacks_completed: Option<CallbacksCompletedFn>,
}

impl NativeFunctionBuilder {
    /// Appends a declared argument. `ValueType::Any` is the wildcard.
    pub fn arg(mut self, arg_type: ValueType, name: impl Into<String>) -> Self {
        self.args.push((arg_type, name.into()));
        self
    }

    /// Marks the function's callback as persistent: it may fire more
    /// than once per call, and the call stays open until torn down.
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Installs the hook that runs once every session of this function
    /// has acknowledged completion of a round.
    pub fn on_all_callbacks_completed(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.all_callbacks_completed = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> NativeFunction {
        let (arg_types, arg_names) = self.args.into_iter().unzip();
        NativeFunction {
            name: String::new(),
            func: self.func,
            arg_types,
            arg_names,
            persistent: self.persistent,
            all_callbacks_completed: self.all_callbacks_completed,
            sessions: Vec::new(),
        }
    }
}
