//! In-process dispatcher keyed by method name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use super::{DISPATCH_TARGET, DispatchError, Dispatcher, SessionId};

/// Arguments and context handed to a [`MethodHandler`].
#[derive(Debug)]
pub struct MethodCall<'a> {
    /// Session the call is made on behalf of.
    pub session: SessionId,
    /// Positional arguments, excluding the method name.
    pub arguments: Vec<Value>,
    /// Table the method was resolved from.
    pub table: &'a MethodTable,
}

/// Function executing a registered method.
pub type MethodHandler =
    Arc<dyn Fn(MethodCall<'_>) -> Result<Value, DispatchError> + Send + Sync>;

#[derive(Default)]
struct Entries {
    order: Vec<String>,
    handlers: HashMap<String, MethodHandler>,
}

/// Dispatcher backed by handlers registered in this process.
///
/// Methods are listed in registration order. Registering a name twice
/// replaces the handler but keeps the original listing position.
#[derive(Default)]
pub struct MethodTable {
    entries: RwLock<Entries>,
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodTable")
            .field("methods", &self.names())
            .finish()
    }
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(MethodCall<'_>) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.handlers.contains_key(&name) {
            entries.order.push(name.clone());
        }
        entries.handlers.insert(name, Arc::new(handler));
    }

    /// Registered method names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    fn handler(&self, name: &str) -> Option<MethodHandler> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .get(name)
            .cloned()
    }
}

impl Dispatcher for MethodTable {
    fn method_names(&self, _session: SessionId) -> Vec<String> {
        self.names()
    }

    fn invoke(
        &self,
        session: SessionId,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        let handler = self
            .handler(method)
            .ok_or_else(|| DispatchError::unknown_method(method))?;
        debug!(
            target: DISPATCH_TARGET,
            %session,
            method,
            arguments = arguments.len(),
            "invoking method"
        );
        handler(MethodCall {
            session,
            arguments,
            table: self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchErrorKind, SESSION_ID};
    use serde_json::json;

    #[test]
    fn lists_methods_in_registration_order() {
        let table = MethodTable::new();
        table.register("zeta", |_| Ok(Value::Null));
        table.register("alpha", |_| Ok(Value::Null));
        table.register("zeta", |_| Ok(json!(1)));
        assert_eq!(table.method_names(SESSION_ID), ["zeta", "alpha"]);
    }

    #[test]
    fn last_registration_wins() {
        let table = MethodTable::new();
        table.register("value", |_| Ok(json!(1)));
        table.register("value", |_| Ok(json!(2)));
        let result = table
            .invoke(SESSION_ID, "value", Vec::new())
            .expect("method should succeed");
        assert_eq!(result, json!(2));
    }

    #[test]
    fn forwards_arguments_to_the_handler() {
        let table = MethodTable::new();
        table.register("count", |call| Ok(json!(call.arguments.len())));
        let result = table
            .invoke(SESSION_ID, "count", vec![json!("a"), json!("b")])
            .expect("method should succeed");
        assert_eq!(result, json!(2));
    }

    #[test]
    fn unknown_methods_are_structured_errors() {
        let table = MethodTable::new();
        let error = table
            .invoke(SESSION_ID, "missing", Vec::new())
            .expect_err("unknown method");
        assert_eq!(error.kind(), DispatchErrorKind::UnknownMethod);
        assert_eq!(error.detail(), "missing");
    }
}
