//! Execution Contexts
//!
//! One context per loaded document/frame. A context is torn down on
//! navigation; the pending-callback table uses identity comparison to
//! find the entries it owns, and a detached context can no longer run
//! callbacks or receive exceptions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::exception_message;
use crate::message::MessageSender;

/// Script exception thrown into a context by the protocol driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptException {
    /// The registered function whose call failed.
    pub function: String,
    /// The status code the native side returned.
    pub status: i32,
    /// Rendered message text; empty for implementation-defined codes.
    pub message: String,
}

impl ScriptException {
    pub(crate) fn from_status(function: &str, status: i32) -> Self {
        Self {
            function: function.to_string(),
            status,
            message: exception_message(function, status),
        }
    }
}

struct ContextState {
    sender: RefCell<Option<Rc<dyn MessageSender>>>,
    exceptions: RefCell<Vec<ScriptException>>,
}

/// Handle to one script execution context.
///
/// Clones share the underlying state; [`ExecutionContext::is_same`]
/// compares identity.
#[derive(Clone)]
pub struct ExecutionContext {
    state: Rc<ContextState>,
}

impl ExecutionContext {
    /// Creates a context attached to the sender that reaches its host
    /// process.
    pub fn new(sender: Rc<dyn MessageSender>) -> Self {
        Self {
            state: Rc::new(ContextState {
                sender: RefCell::new(Some(sender)),
                exceptions: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Whether two handles refer to the same underlying context.
    pub fn is_same(&self, other: &ExecutionContext) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// The sender for this context, if it is still attached.
    pub fn sender(&self) -> Option<Rc<dyn MessageSender>> {
        self.state.sender.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.state.sender.borrow().is_some()
    }

    /// Detaches the context from its sender. Called when the document
    /// navigates away; results arriving afterwards are dropped.
    pub fn detach(&self) {
        *self.state.sender.borrow_mut() = None;
    }

    /// Throws a script exception local to this context.
    pub fn throw(&self, exception: ScriptException) {
        log::debug!(
            "script exception in `{}`: {}",
            exception.function,
            exception.message
        );
        self.state.exceptions.borrow_mut().push(exception);
    }

    /// Drains the exceptions thrown so far; this is how the embedding
    /// script host surfaces them to the page.
    pub fn take_exceptions(&self) -> Vec<ScriptException> {
        self.state.exceptions.borrow_mut().drain(..).collect()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("attached", &self.is_attached())
            .finish()
    }
}
