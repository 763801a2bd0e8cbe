//! Adapter exposing [`CompletionEngine`] to `rustyline`.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::completion::{Completion, CompletionEngine};

/// Editor helper completing method names from the start of the line.
///
/// The token is everything before the cursor. Replacements are inserted at
/// the cursor, so a unique match appends its suffix. Candidate lists carry
/// empty replacements: the editor inserts the longest common prefix of the
/// replacements, and nothing may be inserted unless exactly one name matches.
#[derive(Debug, Clone)]
pub(crate) struct CompletionHelper {
    engine: CompletionEngine,
}

impl CompletionHelper {
    pub(crate) const fn new(engine: CompletionEngine) -> Self {
        Self { engine }
    }

    pub(crate) const fn engine(&self) -> &CompletionEngine {
        &self.engine
    }

    fn pairs(&self, token: &str) -> Vec<Pair> {
        match self.engine.complete(token) {
            Completion::Unique(suffix) => vec![Pair {
                display: format!("{token}{suffix}"),
                replacement: suffix.to_owned(),
            }],
            Completion::Candidates(names) => names
                .into_iter()
                .map(|name| Pair {
                    display: name.to_owned(),
                    replacement: String::new(),
                })
                .collect(),
        }
    }
}

impl Completer for CompletionHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let token = line.get(..pos).unwrap_or(line);
        Ok((pos, self.pairs(token)))
    }
}

impl Hinter for CompletionHelper {
    type Hint = String;
}

impl Highlighter for CompletionHelper {}

impl Validator for CompletionHelper {}

impl Helper for CompletionHelper {}
