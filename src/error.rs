use crate::term::{Symbol, Term};
use thiserror::Error;

/// Errors raised at the engine's API boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Facts must be ground
    #[error("fact `{fact}` contains variables")]
    NonGroundFact {
        /// The rejected term
        fact: Term,
    },

    /// A predicate was used with two different arities
    #[error("predicate `{predicate}` used with arity {found}, previously {expected}")]
    ArityMismatch {
        /// The predicate name
        predicate: Symbol,
        /// The arity recorded first
        expected: usize,
        /// The conflicting arity
        found: usize,
    },

    /// A rule needs at least one body conjunct
    #[error("rule `{head}` has an empty body")]
    EmptyRuleBody {
        /// The head of the rejected rule
        head: Term,
    },

    /// Every head variable must occur in the body
    #[error("rule `{rule}`: variable `{variable}` appears in head but not in body")]
    UnboundHeadVariable {
        /// The rejected rule, rendered
        rule: String,
        /// The offending variable
        variable: Symbol,
    },

    /// Grounding substitution found no binding for a variable
    #[error("variable `{variable}` is not bound")]
    UnboundVariable {
        /// The unbound variable
        variable: Symbol,
    },

    /// Binding sets map variable names only
    #[error("`{name}` is not a variable name")]
    NotAVariable {
        /// The rejected key
        name: Symbol,
    },

    /// A fixpoint loop would still add facts after the configured number of rounds
    #[error("fixpoint not reached after {limit} rounds")]
    RoundLimitExceeded {
        /// The configured limit
        limit: usize,
    },

    /// Program text could not be parsed
    #[cfg(feature = "parsing")]
    #[error("parse error: {message}")]
    Parse {
        /// What went wrong and where
        message: String,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;
