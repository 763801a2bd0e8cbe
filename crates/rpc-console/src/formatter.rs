//! Per-method rendering of dispatch results.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// Renders a result given the full call (method name first, then arguments).
pub type Formatter = Arc<dyn Fn(&Value, &[Value]) -> String + Send + Sync>;

/// Formatters keyed by exact method name.
///
/// Registration may happen while a console is running. The lock is held only
/// to clone a formatter out, so a concurrent registration is either seen
/// whole by the next lookup or not at all.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: RwLock<HashMap<String, Formatter>>,
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatters = self
            .formatters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        formatter
            .debug_struct("FormatterRegistry")
            .field("methods", &formatters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FormatterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the formatter for `method`, replacing any previous one.
    pub fn set<F>(&self, method: impl Into<String>, formatter: F)
    where
        F: Fn(&Value, &[Value]) -> String + Send + Sync + 'static,
    {
        self.formatters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.into(), Arc::new(formatter));
    }

    /// Formatter registered for `method`, if any.
    #[must_use]
    pub fn get(&self, method: &str) -> Option<Formatter> {
        self.formatters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()
    }

    /// Renders `result` with the formatter for `method`, or pretty-prints it.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error when the default printer fails.
    pub fn render(
        &self,
        method: &str,
        result: &Value,
        call: &[Value],
    ) -> Result<String, serde_json::Error> {
        match self.get(method) {
            Some(formatter) => Ok(formatter(result, call)),
            None => serde_json::to_string_pretty(result),
        }
    }
}

/// Renders an array result one element per line, strings unquoted.
///
/// Results that are not arrays are rendered as compact JSON.
#[must_use]
pub fn render_lines(result: &Value, _call: &[Value]) -> String {
    let Some(items) = result.as_array() else {
        return result.to_string();
    };
    items
        .iter()
        .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
        .collect::<Vec<_>>()
        .join("\n")
}
