//! Prefix completion over the method registry.
//!
//! The engine answers two questions about the token being typed (the text
//! from the start of the line up to the cursor): is there exactly one method
//! it can become, and which methods could it become. Matching is an exact,
//! case-sensitive prefix test; candidates keep the registry order.

use crate::registry::CommandRegistry;

/// Outcome of completing a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<'a> {
    /// Exactly one method matched; holds the text to append to the token.
    Unique(&'a str),
    /// Zero or several methods matched; holds every match in registry order.
    Candidates(Vec<&'a str>),
}

/// Computes completions against a [`CommandRegistry`] snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionEngine {
    registry: CommandRegistry,
}

impl CompletionEngine {
    /// Creates an engine over the given snapshot.
    #[must_use]
    pub const fn new(registry: CommandRegistry) -> Self {
        Self { registry }
    }

    /// Snapshot the engine matches against.
    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Every method name beginning with `token`, in registry order.
    #[must_use]
    pub fn matches<'a>(&'a self, token: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.registry
            .names()
            .iter()
            .map(String::as_str)
            .filter(move |name| name.starts_with(token))
    }

    /// Remaining suffix when `token` identifies exactly one method.
    #[must_use]
    pub fn unique_suffix<'a>(&'a self, token: &'a str) -> Option<&'a str> {
        let mut matches = self.matches(token);
        let only = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        only.strip_prefix(token)
    }

    /// Candidate list for `token`, used when the operator asks for the list.
    #[must_use]
    pub fn candidates<'a>(&'a self, token: &'a str) -> Vec<&'a str> {
        self.matches(token).collect()
    }

    /// Completes `token`, preferring a unique suffix over a candidate list.
    #[must_use]
    pub fn complete<'a>(&'a self, token: &'a str) -> Completion<'a> {
        self.unique_suffix(token).map_or_else(
            || Completion::Candidates(self.candidates(token)),
            Completion::Unique,
        )
    }
}
