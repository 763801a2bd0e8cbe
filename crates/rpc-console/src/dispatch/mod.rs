//! Contract between the console and the method-dispatch engine.
//!
//! The console never executes methods itself. It asks a [`Dispatcher`] for the
//! names it can complete, and hands every decoded line to
//! [`Dispatcher::invoke`] under the console's own session. [`MethodTable`] is
//! the in-process implementation used by the binary and by tests.

mod builtins;
mod errors;
mod method_table;

use std::fmt;

use serde_json::Value;

pub use self::builtins::install_builtins;
pub use self::errors::{DispatchError, DispatchErrorKind};
pub use self::method_table::{MethodCall, MethodHandler, MethodTable};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Identifies the session a call is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "session-{}", self.0)
    }
}

/// The console's own session; the console does not multiplex sessions.
pub const SESSION_ID: SessionId = SessionId(0);

/// Executes named methods on behalf of the console.
#[cfg_attr(test, mockall::automock)]
pub trait Dispatcher: Send + Sync {
    /// Lists the methods available to `session`, in presentation order.
    fn method_names(&self, session: SessionId) -> Vec<String>;

    /// Invokes `method` with positional `arguments`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why the call failed.
    fn invoke(
        &self,
        session: SessionId,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError>;
}
