//! Renderer Side
//!
//! The process executing script: execution contexts, call-site
//! descriptors with their generated shims, the pending-callback table,
//! and the renderer half of the protocol driver.

mod context;
mod handler;
mod script;
mod shim;

pub use context::{ExecutionContext, ScriptException};
pub use handler::{FunctionDecl, FunctionProxy};
pub use script::{ScriptFunction, ScriptValue};
