//! Snapshot of method names used for completion.

use std::sync::Arc;

/// Ordered method names captured from the dispatcher when a console starts.
///
/// The snapshot is immutable: starting the console again replaces it
/// wholesale. Clones share the same backing slice, so the run loop and the
/// interactive editor thread see exactly the names listed at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistry {
    names: Arc<[String]>,
}

impl CommandRegistry {
    /// Builds a registry from the dispatcher's method listing, keeping its order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Method names in listing order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no methods were listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns `true` when both registries share the same snapshot.
    #[must_use]
    pub fn same_snapshot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.names, &other.names)
    }
}
