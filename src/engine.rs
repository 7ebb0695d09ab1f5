use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::term::{Symbol, SymbolTable, Term};
use crate::unify::{substitute_ground, unify, Bindings, UnifyMode};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use smallvec::SmallVec;
use std::fmt;

/// A Datalog rule (e.g. `path(X, Z) :- link(X, Y), path(Y, Z).`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    /// The conclusion/consequent of the rule
    pub head: Term,
    /// The conjunction that must be satisfied, evaluated left to right
    pub body: SmallVec<[Term; 4]>,
}

impl Rule {
    /// Create a rule from a head and its body conjuncts
    pub fn new(head: Term, body: impl IntoIterator<Item = Term>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }

    /// Start building a rule for `head`; add conjuncts with
    /// [`when`](RuleBuilder::when) and [`and`](RuleBuilder::and)
    #[must_use]
    pub fn build(head: Term) -> RuleBuilder {
        RuleBuilder {
            rule: Self::new(head, []),
        }
    }

    /// Checks that the body is non-empty and that every head variable
    /// occurs somewhere in the body
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyRuleBody`] or [`EngineError::UnboundHeadVariable`]
    pub fn validate(&self) -> Result<()> {
        if self.body.is_empty() {
            return Err(EngineError::EmptyRuleBody {
                head: self.head.clone(),
            });
        }

        let body_vars: IndexSet<&Symbol> = self.body.iter().flat_map(Term::variables).collect();
        match self
            .head
            .variables()
            .into_iter()
            .find(|var| !body_vars.contains(var))
        {
            Some(variable) => Err(EngineError::UnboundHeadVariable {
                rule: self.to_string(),
                variable: variable.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- ", self.head)?;
        for (i, term) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str(".")
    }
}

/// Incrementally assembles a [`Rule`] body
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    /// Adds the first conjunct
    #[must_use]
    pub fn when(self, term: Term) -> Self {
        self.and(term)
    }

    /// Adds another conjunct
    #[must_use]
    pub fn and(mut self, term: Term) -> Self {
        self.rule.body.push(term);
        self
    }
}

impl From<RuleBuilder> for Rule {
    fn from(builder: RuleBuilder) -> Self {
        builder.rule
    }
}

/// One answer to a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// A fact matched and no variable was bound (e.g. a ground query)
    Matched,
    /// A fact matched with these variable bindings
    Bindings(Bindings),
}

impl Answer {
    /// The bindings of this answer, if any
    #[must_use]
    pub fn bindings(&self) -> Option<&Bindings> {
        match self {
            Self::Matched => None,
            Self::Bindings(bindings) => Some(bindings),
        }
    }

    /// The term bound to `variable`, if any
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings().and_then(|bindings| bindings.get(variable))
    }
}

/// Lazily unifies a query pattern against every stored fact.
///
/// Cloning yields an independent iterator restarted from the same position,
/// so an answer sequence can be walked more than once.
#[derive(Debug, Clone)]
pub struct Answers<'a> {
    facts: indexmap::set::Iter<'a, Term>,
    pattern: Term,
    mode: UnifyMode,
}

impl Iterator for Answers<'_> {
    type Item = Answer;

    fn next(&mut self) -> Option<Answer> {
        self.facts.by_ref().find_map(|fact| {
            unify(fact, &self.pattern, self.mode).map(|bindings| {
                if bindings.is_empty() {
                    Answer::Matched
                } else {
                    Answer::Bindings(bindings)
                }
            })
        })
    }
}

/// Enumerates every binding set satisfying the conjunction `body` against `facts`.
///
/// Each conjunct, left to right, is unified against every fact; a candidate is
/// kept when it agrees with the bindings accumulated so far. A conjunct that
/// matches a fact without binding anything still contributes an empty set, so
/// ground conjuncts act as filters. An empty body is satisfied once, by the
/// empty binding set.
///
/// This is a plain nested-loop join without indexing: the cost grows with the
/// product of the fact store size over the conjuncts.
#[must_use]
pub fn enumerate_bindings(
    body: &[Term],
    facts: &IndexSet<Term>,
    mode: UnifyMode,
) -> Vec<Bindings> {
    body.iter()
        .try_fold(vec![Bindings::new()], |partials, conjunct| {
            let candidates: Vec<Bindings> = facts
                .iter()
                .filter_map(|fact| unify(conjunct, fact, mode))
                .collect();

            let extended: Vec<Bindings> = partials
                .into_iter()
                .flat_map(|partial| {
                    candidates.iter().filter_map(move |candidate| {
                        if candidate.is_consistent_with(&partial) {
                            partial.clone().merge(candidate.clone(), mode)
                        } else {
                            None
                        }
                    })
                })
                .collect();

            trace!(
                "Conjunct {conjunct}: {} candidates, {} partial bindings",
                candidates.len(),
                extended.len()
            );

            // Nothing left to extend
            if extended.is_empty() {
                None
            } else {
                Some(extended)
            }
        })
        .unwrap_or_default()
}

/// The forward-chaining evaluation engine
///
/// Facts and rules live for the lifetime of the engine. Every new fact and
/// every new rule brings the store back to a fixpoint before returning.
#[derive(Debug)]
pub struct Engine {
    facts: IndexSet<Term>,
    rules: Vec<Rule>,
    /// Arity recorded for each predicate at first use
    arities: IndexMap<Symbol, usize>,
    symbols: SymbolTable,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            facts: IndexSet::new(),
            rules: Vec::new(),
            arities: IndexMap::new(),
            symbols: SymbolTable::new(),
            config,
        }
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mints an interned constant or variable (uppercase-initial) by name
    pub fn sym(&self, name: &str) -> Term {
        Term::symbol(self.symbols.intern(name))
    }

    /// Mints a compound term with an interned predicate name
    pub fn pred(&self, name: &str, args: impl IntoIterator<Item = Term>) -> Term {
        Term::apply(self.symbols.intern(name), args)
    }

    /// Add a fact to the knowledge base, then bring every rule back to a fixpoint.
    ///
    /// Returns `false` (and does nothing) if the fact is already stored.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NonGroundFact`] if the fact contains variables
    /// - [`EngineError::ArityMismatch`] if its predicate was used with another arity
    /// - [`EngineError::RoundLimitExceeded`] if saturation outran `max_rounds`;
    ///   facts derived up to that point are kept
    pub fn assert_fact(&mut self, fact: Term) -> Result<bool> {
        if !fact.is_ground() {
            return Err(EngineError::NonGroundFact { fact });
        }
        register_arity(&mut self.arities, &fact)?;
        if self.facts.contains(&fact) {
            return Ok(false);
        }

        debug!("Asserting fact {fact}");
        self.facts.insert(fact);
        self.saturate()?;
        Ok(true)
    }

    /// Add a rule, derive everything it implies, then bring every rule back to
    /// a fixpoint.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptyRuleBody`] or [`EngineError::UnboundHeadVariable`]
    ///   for rules that could derive non-ground facts
    /// - [`EngineError::ArityMismatch`] if a predicate was used with another arity
    /// - [`EngineError::RoundLimitExceeded`] if evaluation outran `max_rounds`;
    ///   the rule and the facts derived up to that point are kept
    pub fn define_rule(&mut self, rule: impl Into<Rule>) -> Result<()> {
        let rule = rule.into();
        rule.validate()?;
        // All or nothing: a rejected rule leaves no arities behind
        let mut arities = self.arities.clone();
        for term in std::iter::once(&rule.head).chain(&rule.body) {
            register_arity(&mut arities, term)?;
        }
        self.arities = arities;

        debug!("Defining rule {rule}");
        self.rules.push(rule);
        if self.derive_facts(self.rules.len() - 1)? > 0 {
            self.saturate()?;
        }
        Ok(())
    }

    /// Shorthand for [`define_rule`](Self::define_rule) from a head and its body
    ///
    /// # Errors
    ///
    /// See [`define_rule`](Self::define_rule)
    pub fn rule(&mut self, head: Term, body: impl IntoIterator<Item = Term>) -> Result<()> {
        self.define_rule(Rule::new(head, body))
    }

    /// Returns every answer to `pattern`, one per matching fact.
    ///
    /// Ground matches surface as [`Answer::Matched`]. The store is never modified.
    #[must_use]
    pub fn query(&self, pattern: &Term) -> Answers<'_> {
        Answers {
            facts: self.facts.iter(),
            pattern: pattern.clone(),
            mode: self.config.unify_mode,
        }
    }

    /// Returns whether any fact matches `pattern`
    #[must_use]
    pub fn ask(&self, pattern: &Term) -> bool {
        self.query(pattern).next().is_some()
    }

    /// Every binding set satisfying `body` against the current store
    #[must_use]
    pub fn enumerate_bindings(&self, body: &[Term]) -> Vec<Bindings> {
        enumerate_bindings(body, &self.facts, self.config.unify_mode)
    }

    /// All stored facts, asserted and derived, in insertion order
    pub fn facts(&self) -> impl Iterator<Item = &Term> {
        self.facts.iter()
    }

    /// Stored facts whose predicate is `predicate`
    pub fn facts_of<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.facts
            .iter()
            .filter(move |fact| fact.functor().as_str() == predicate)
    }

    /// Returns true if `fact` is stored
    #[must_use]
    pub fn contains(&self, fact: &Term) -> bool {
        self.facts.contains(fact)
    }

    /// Number of stored facts
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Defined rules in definition order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Runs one rule to its own fixpoint: join the body against the whole
    /// store, insert the substituted heads, and repeat from scratch while the
    /// store keeps growing. Returns the number of facts added.
    ///
    /// Only rounds that add facts count against `max_rounds`; a round past the
    /// limit fails before inserting anything.
    fn derive_facts(&mut self, index: usize) -> Result<usize> {
        let mut added = 0;
        let mut round = 0;
        loop {
            let rule = &self.rules[index];
            let fresh: Vec<Term> =
                enumerate_bindings(&rule.body, &self.facts, self.config.unify_mode)
                    .iter()
                    .map(|bindings| substitute_ground(&rule.head, bindings))
                    .filter(|derived| !matches!(derived, Ok(fact) if self.facts.contains(fact)))
                    .collect::<Result<_>>()?;
            if fresh.is_empty() {
                return Ok(added);
            }
            self.next_round(&mut round)?;

            for fact in fresh {
                let (position, inserted) = self.facts.insert_full(fact);
                if inserted {
                    trace!("Rule {index} derived {}", self.facts[position]);
                    added += 1;
                }
            }
        }
    }

    /// Re-runs every rule in definition order until a whole pass adds nothing.
    /// Passes that add facts count against `max_rounds`.
    fn saturate(&mut self) -> Result<()> {
        if self.rules.is_empty() {
            return Ok(());
        }

        let mut round = 0;
        loop {
            let mut added = 0;
            for index in 0..self.rules.len() {
                added += self.derive_facts(index)?;
            }

            debug!(
                "Saturation pass {}: {added} new facts, {} total",
                round + 1,
                self.facts.len()
            );
            if added == 0 {
                return Ok(());
            }
            self.next_round(&mut round)?;
        }
    }

    fn next_round(&self, round: &mut usize) -> Result<()> {
        *round += 1;
        match self.config.max_rounds {
            Some(limit) if *round > limit => {
                warn!("Round limit of {limit} reached with facts still being derived");
                Err(EngineError::RoundLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }
}

/// Records the arity of `term`'s predicate, failing if it was seen with another
fn register_arity(arities: &mut IndexMap<Symbol, usize>, term: &Term) -> Result<()> {
    if term.is_variable() {
        return Ok(());
    }
    let expected = *arities
        .entry(term.functor().clone())
        .or_insert_with(|| term.arity());
    if expected == term.arity() {
        Ok(())
    } else {
        Err(EngineError::ArityMismatch {
            predicate: term.functor().clone(),
            expected,
            found: term.arity(),
        })
    }
}
