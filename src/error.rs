//! Status Codes and Errors
//!
//! Status codes are plain integers on the wire; native implementations
//! may return codes beyond the ones named here, which surface as generic
//! script exceptions.

use thiserror::Error;

/// Call completed successfully.
pub const NO_ERROR: i32 = 0;
/// Unspecified failure in the native implementation.
pub const ERR_UNKNOWN: i32 = 1;
/// The call carried the wrong number of arguments.
pub const ERR_INVALID_PARAM_NUM: i32 = 2;
/// One or more arguments had a type the signature does not accept.
pub const ERR_INVALID_PARAM_TYPES: i32 = 3;

/// Failure while registering a function on either side of the bridge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The name collides with one of the reserved protocol messages.
    #[error("function name `{0}` is a reserved protocol message name")]
    ReservedName(String),
}

/// Renders the script-visible exception text for a status code.
/// Codes without a dedicated message produce an empty string.
pub(crate) fn exception_message(function_name: &str, status: i32) -> String {
    match status {
        ERR_INVALID_PARAM_NUM => {
            format!("Invalid number of parameters for function {}", function_name)
        }
        ERR_INVALID_PARAM_TYPES => {
            format!("Invalid parameter types for function {}", function_name)
        }
        _ => String::new(),
    }
}
