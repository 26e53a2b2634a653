//! Host Side
//!
//! The process hosting native function implementations: the function
//! registry, the pending-invocation sessions of persistent callbacks,
//! and the host half of the protocol driver.

mod function;
mod handler;
mod worker;

pub use function::{CallbacksCompletedFn, NativeFn, NativeFunction, NativeFunctionBuilder};
pub use handler::FunctionHost;
pub use worker::{HostClient, HostCommand, HostWorker};
