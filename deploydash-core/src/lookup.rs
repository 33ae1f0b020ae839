//! Outcome type for lookups where "nothing there" is a normal answer.
//!
//! A missing directory, an absent README, or an overlay that does not
//! mention a service are expected states, not failures. Wrapping them in
//! [`Lookup`] keeps them apart from transport errors, which travel in the
//! surrounding `Result`.

use serde::{Deserialize, Serialize};

/// Either a value, or a reason why the question did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    NotApplicable { reason: String },
}

impl<T> Lookup<T> {
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Lookup::NotApplicable {
            reason: reason.into(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotApplicable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotApplicable { reason } => Lookup::NotApplicable { reason },
        }
    }
}

impl<T: Default> Lookup<T> {
    /// The found value, or `T::default()` (an empty list, an empty string).
    pub fn unwrap_or_empty(self) -> T {
        self.found().unwrap_or_default()
    }
}
