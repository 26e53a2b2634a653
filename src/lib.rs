//! # appbridge
//!
//! Cross-process function bridge between script running in a renderer
//! process and native code running in its host process, with no shared
//! memory: all interaction flows through discrete named messages with
//! ordered argument lists.
//!
//! Native functions registered on the host side become callable from the
//! page as `app.<name>(args.., callback)`. Each call carries a
//! monotonically increasing call identifier; results are delivered
//! asynchronously and correlated back to the stored script callback long
//! after the original call stack has returned. Persistent callbacks can
//! fire repeatedly for one call (event subscriptions), with each firing
//! acknowledged back to the host so it can tell when a round of
//! notifications has fully completed. Native-side errors surface as
//! script exceptions in the originating execution context.
//!
//! The transport delivering messages between the two processes is a
//! primitive: anything implementing [`message::MessageSender`]. The
//! [`transport`] module provides an in-process channel implementation.
//!
//! ## Example
//!
//! ```rust
//! use appbridge::error::NO_ERROR;
//! use appbridge::host::{FunctionHost, NativeFunction};
//! use appbridge::value::{Value, ValueType};
//!
//! let mut host = FunctionHost::new();
//! host.register(
//!     "add",
//!     NativeFunction::builder(|args, ret| {
//!         let sum = args.get_int(0).unwrap_or(0) + args.get_int(1).unwrap_or(0);
//!         ret.push(Value::Int(sum));
//!         NO_ERROR
//!     })
//!     .arg(ValueType::Int, "a")
//!     .arg(ValueType::Int, "b")
//!     .build(),
//! )
//! .unwrap();
//! ```

pub mod error;
pub mod host;
pub mod message;
pub mod renderer;
pub mod transport;
pub mod value;
