//! # Naivelog
//!
//! A minimal forward-chaining Datalog engine with reference semantics:
//! unification, substitution and naive fixpoint evaluation over a growing
//! fact store.
//!
//! ## Features
//!
//! - Terms with nested compound arguments
//! - Rules re-evaluated to a fixpoint on every assertion
//! - Pattern-matching queries with lazy, restartable answers
//! - Textual programs behind the `parsing` feature
//!
//! ## Example
//!
//! ```rust
//! use naivelog::{Answer, Engine, Rule};
//!
//! # fn main() -> naivelog::Result<()> {
//! let mut engine = Engine::new();
//! let (x, y, z) = (engine.sym("X"), engine.sym("Y"), engine.sym("Z"));
//!
//! for (from, to) in [("a", "b"), ("b", "c")] {
//!     engine.assert_fact(engine.pred("link", [engine.sym(from), engine.sym(to)]))?;
//! }
//!
//! // reachable(X, Y) :- link(X, Y).
//! engine.define_rule(
//!     Rule::build(engine.pred("reachable", [x.clone(), y.clone()]))
//!         .when(engine.pred("link", [x.clone(), y.clone()])),
//! )?;
//! // reachable(X, Y) :- link(X, Z), reachable(Z, Y).
//! engine.define_rule(
//!     Rule::build(engine.pred("reachable", [x.clone(), y.clone()]))
//!         .when(engine.pred("link", [x.clone(), z.clone()]))
//!         .and(engine.pred("reachable", [z, y])),
//! )?;
//!
//! let from_a: Vec<Answer> = engine
//!     .query(&engine.pred("reachable", [engine.sym("a"), x]))
//!     .collect();
//! assert_eq!(from_a.len(), 2);
//!
//! let ground = engine.pred("reachable", [engine.sym("a"), engine.sym("c")]);
//! assert_eq!(engine.query(&ground).next(), Some(Answer::Matched));
//! # Ok(())
//! # }
//! ```

/// Evaluation settings.
pub mod config;
/// Rules, the fact store, fixpoint evaluation and queries.
pub mod engine;
/// Error types.
pub mod error;
/// Program text parsing.
#[cfg(feature = "parsing")]
pub mod parser;
/// Symbols and terms.
pub mod term;
/// Unification and substitution.
pub mod unify;

pub use config::EngineConfig;
pub use engine::{enumerate_bindings, Answer, Answers, Engine, Rule, RuleBuilder};
pub use error::{EngineError, Result};
#[cfg(feature = "parsing")]
pub use parser::{parse_program, parse_rule, parse_term, Statement};
pub use term::{Symbol, SymbolTable, Term};
pub use unify::{substitute, substitute_ground, unify, Bindings, UnifyMode};
