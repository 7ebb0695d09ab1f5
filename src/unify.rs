use crate::error::{EngineError, Result};
use crate::term::{Kind, Symbol, Term};
use indexmap::IndexMap;
use std::fmt;

/// How the per-argument binding sets of a compound unification are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnifyMode {
    /// A variable bound to two different terms fails the unification
    #[default]
    Strict,
    /// A later argument position silently overwrites an earlier binding
    Permissive,
}

/// A set of variable bindings (e.g. `{X -> bob, Y -> car(red)}`)
///
/// Keys are always variable names. Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Bindings(IndexMap<Symbol, Term>);

impl Bindings {
    /// An empty binding set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn single(variable: Symbol, value: Term) -> Self {
        let mut map = IndexMap::with_capacity(1);
        map.insert(variable, value);
        Self(map)
    }

    /// The term bound to `variable`, if any
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.0.get(variable)
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no variable is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(variable, value)` pairs in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Term)> {
        self.0.iter()
    }

    /// Binds `variable` to `value`, returning the previous value
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAVariable`] if `variable` is not an uppercase-initial name
    pub fn insert(&mut self, variable: Symbol, value: Term) -> Result<Option<Term>> {
        if !variable.is_variable_name() {
            return Err(EngineError::NotAVariable { name: variable });
        }
        Ok(self.0.insert(variable, value))
    }

    /// Builds a binding set from `(variable, value)` pairs; later pairs win
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAVariable`] for the first key that is not a variable name
    pub fn try_from_pairs(pairs: impl IntoIterator<Item = (Symbol, Term)>) -> Result<Self> {
        let mut bindings = Self::new();
        for (variable, value) in pairs {
            bindings.insert(variable, value)?;
        }
        Ok(bindings)
    }

    /// Two binding sets are consistent when they agree on every shared variable
    #[must_use]
    pub fn is_consistent_with(&self, other: &Bindings) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .all(|(var, value)| !matches!(large.get(var.as_str()), Some(bound) if bound != value))
    }

    /// Folds `other` into `self`.
    ///
    /// In strict mode a conflicting binding yields `None`; in permissive mode
    /// the binding from `other` wins.
    #[must_use]
    pub fn merge(mut self, other: Bindings, mode: UnifyMode) -> Option<Bindings> {
        for (var, value) in other.0 {
            match self.0.get(&var) {
                Some(bound) if *bound != value && mode == UnifyMode::Strict => return None,
                _ => {
                    self.0.insert(var, value);
                }
            }
        }
        Some(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Bindings {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let pairs = <IndexMap<Symbol, Term> as serde::Deserialize>::deserialize(deserializer)?;
        Self::try_from_pairs(pairs).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a Symbol, &'a Term);
    type IntoIter = indexmap::map::Iter<'a, Symbol, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var} = {value}")?;
        }
        f.write_str("}")
    }
}

/// Computes the binding set that makes `a` and `b` structurally equal.
///
/// - Equal terms unify with no bindings.
/// - A variable on either side binds to the other side as a whole.
/// - Compounds with the same predicate and arity unify argument-wise; the
///   per-argument binding sets are merged according to `mode`.
///
/// Bindings are not applied to later argument pairs, so `f(X, X)` against
/// `f(Y, a)` yields `X -> Y` then `X -> a`: a conflict in strict mode.
/// Returns `None` when no unifier exists.
#[must_use]
pub fn unify(a: &Term, b: &Term, mode: UnifyMode) -> Option<Bindings> {
    if a == b {
        return Some(Bindings::new());
    }

    match (a.kind(), b.kind()) {
        (Kind::Var(var), _) => Some(Bindings::single(var.clone(), b.clone())),
        (_, Kind::Var(var)) => Some(Bindings::single(var.clone(), a.clone())),
        (
            Kind::Compound {
                functor: left_functor,
                args: left_args,
            },
            Kind::Compound {
                functor: right_functor,
                args: right_args,
            },
        ) if left_functor == right_functor && left_args.len() == right_args.len() => left_args
            .iter()
            .zip(right_args.iter())
            .try_fold(Bindings::new(), |acc, (left, right)| {
                acc.merge(unify(left, right, mode)?, mode)
            }),
        _ => None,
    }
}

/// Applies `bindings` to `term`.
///
/// Variables without a binding stay in place, so the result may still be open.
#[must_use]
pub fn substitute(term: &Term, bindings: &Bindings) -> Term {
    match term.kind() {
        Kind::Var(var) => bindings
            .get(var.as_str())
            .cloned()
            .unwrap_or_else(|| term.clone()),
        Kind::Const(_) => term.clone(),
        Kind::Compound { functor, args } => {
            if term.is_ground() {
                return term.clone();
            }
            Term::apply(
                functor.clone(),
                args.iter().map(|arg| substitute(arg, bindings)),
            )
        }
    }
}

/// Applies `bindings` to `term` and requires a ground result.
///
/// # Errors
///
/// Returns [`EngineError::UnboundVariable`] naming the first variable left open
pub fn substitute_ground(term: &Term, bindings: &Bindings) -> Result<Term> {
    let result = substitute(term, bindings);
    let unbound = result.variables().first().map(|&variable| variable.clone());
    match unbound {
        Some(variable) => Err(EngineError::UnboundVariable { variable }),
        None => Ok(result),
    }
}
