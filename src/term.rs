use indexmap::IndexSet;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An interned name shared by every term that mentions it.
///
/// Equality and hashing go by content, so symbols minted by different
/// tables (or not interned at all) still compare equal when their names match.
#[derive(Debug, Clone, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// The symbol's name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase-initial names denote variables (e.g. `X`, `Who`)
    #[must_use]
    pub fn is_variable_name(&self) -> bool {
        self.0.chars().next().is_some_and(char::is_uppercase)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<Arc<str>> for Symbol {
    fn from(name: Arc<str>) -> Self {
        Self(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Datalog term: a constant, a variable, or a predicate applied to arguments
/// (e.g. `bob`, `X`, `link(a, X)`)
///
/// Terms are built through [`Term::symbol`] and [`Term::apply`] only, so a
/// term's kind always follows its name and a compound is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Term(Kind);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) enum Kind {
    Const(Symbol),
    Var(Symbol),
    Compound { functor: Symbol, args: Arc<[Term]> },
}

impl Term {
    /// Creates a constant or variable, classified by the uppercase-initial convention
    pub fn symbol(name: impl Into<Symbol>) -> Self {
        let name = name.into();
        if name.is_variable_name() {
            Self(Kind::Var(name))
        } else {
            Self(Kind::Const(name))
        }
    }

    /// Applies `functor` to `args`.
    ///
    /// A compound always carries at least one argument: applying to an empty
    /// list yields the plain symbol instead.
    pub fn apply(functor: impl Into<Symbol>, args: impl IntoIterator<Item = Term>) -> Self {
        let args: Arc<[Term]> = args.into_iter().collect();
        if args.is_empty() {
            Self::symbol(functor)
        } else {
            Self(Kind::Compound {
                functor: functor.into(),
                args,
            })
        }
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.0
    }

    /// Returns true for variables
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.0, Kind::Var(_))
    }

    /// Returns true for predicate-applied terms
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self.0, Kind::Compound { .. })
    }

    /// Returns true when no variable occurs anywhere in the term
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match &self.0 {
            Kind::Const(_) => true,
            Kind::Var(_) => false,
            Kind::Compound { args, .. } => args.iter().all(Term::is_ground),
        }
    }

    /// The constant/variable name, or the predicate name of a compound
    #[must_use]
    pub fn functor(&self) -> &Symbol {
        match &self.0 {
            Kind::Const(name) | Kind::Var(name) => name,
            Kind::Compound { functor, .. } => functor,
        }
    }

    /// Arguments of a compound; empty for atomic terms
    #[must_use]
    pub fn args(&self) -> &[Term] {
        match &self.0 {
            Kind::Compound { args, .. } => args,
            Kind::Const(_) | Kind::Var(_) => &[],
        }
    }

    /// Number of arguments (0 for atomic terms)
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args().len()
    }

    /// Distinct variables in left-to-right order.
    /// Example: `parent(X, Y, X)` -> `[X, Y]`
    #[must_use]
    pub fn variables(&self) -> Vec<&Symbol> {
        let mut seen = IndexSet::new();
        self.collect_variables(&mut seen);
        seen.into_iter().collect()
    }

    fn collect_variables<'a>(&'a self, seen: &mut IndexSet<&'a Symbol>) {
        match &self.0 {
            Kind::Var(name) => {
                seen.insert(name);
            }
            Kind::Const(_) => {}
            Kind::Compound { args, .. } => {
                for arg in args.iter() {
                    arg.collect_variables(seen);
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Const(name) | Kind::Var(name) => write!(f, "{name}"),
            Kind::Compound { functor, args } => {
                write!(f, "{functor}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Rejects terms whose kind disagrees with their name, and empty compounds
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Term {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let term = Self(<Kind as serde::Deserialize>::deserialize(deserializer)?);
        let well_formed = match &term.0 {
            Kind::Const(name) => !name.is_variable_name(),
            Kind::Var(name) => name.is_variable_name(),
            Kind::Compound { args, .. } => !args.is_empty(),
        };
        if well_formed {
            Ok(term)
        } else {
            Err(serde::de::Error::custom(format!("malformed term `{term}`")))
        }
    }
}

/// Interns symbol names so repeated names share one allocation.
///
/// Interning goes through `&self` so terms can be minted while building the
/// argument list of another call on the same owner.
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: RefCell<IndexSet<Arc<str>>>,
}

impl SymbolTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared symbol for `name`, interning it on first use
    pub fn intern(&self, name: &str) -> Symbol {
        let mut names = self.names.borrow_mut();
        if let Some(existing) = names.get(name) {
            return Symbol(Arc::clone(existing));
        }
        let shared: Arc<str> = Arc::from(name);
        names.insert(Arc::clone(&shared));
        Symbol(shared)
    }

    /// Number of distinct names interned so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    /// Returns true if nothing has been interned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn link(a: &str, b: &str) -> Term {
        Term::apply("link", [Term::symbol(a), Term::symbol(b)])
    }

    #[test]
    fn test_uppercase_names_are_variables() {
        assert!(Term::symbol("X").is_variable());
        assert!(Term::symbol("Who").is_variable());
        assert!(!Term::symbol("bob").is_variable());
        assert!(!Term::symbol("_x").is_variable());
        assert!(!Term::symbol("").is_variable());
    }

    #[test]
    fn test_compound_classification() {
        let fact = link("a", "b");
        assert!(fact.is_compound());
        assert_eq!(fact.arity(), 2);
        assert_eq!(fact.functor().as_str(), "link");
        assert!(!Term::symbol("a").is_compound());
    }

    #[test]
    fn test_apply_with_no_args_is_atomic() {
        let t = Term::apply("raining", []);
        assert_eq!(t, Term::symbol("raining"));
        assert!(!t.is_compound());
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let mut set = HashSet::new();
        set.insert(link("a", "b"));
        set.insert(link("a", "b"));
        set.insert(link("b", "a"));
        assert_eq!(set.len(), 2);

        // Same name, different arity
        let unary = Term::apply("link", [Term::symbol("a")]);
        assert_ne!(unary, link("a", "a"));
        // Different predicate, same args
        let other = Term::apply("edge", [Term::symbol("a"), Term::symbol("b")]);
        assert_ne!(other, link("a", "b"));
    }

    #[test]
    fn test_groundness_and_variables() {
        assert!(link("a", "b").is_ground());

        let open = Term::apply(
            "parent",
            [Term::symbol("X"), Term::symbol("Y"), Term::symbol("X")],
        );
        assert!(!open.is_ground());
        let names: Vec<&str> = open.variables().into_iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn test_nested_compound_display() {
        let t = Term::apply(
            "owns",
            [
                Term::symbol("bob"),
                Term::apply("car", [Term::symbol("red")]),
            ],
        );
        assert_eq!(t.to_string(), "owns(bob, car(red))");
    }

    #[test]
    fn test_symbol_table_shares_allocations() {
        let table = SymbolTable::new();
        let a = table.intern("alice");
        let b = table.intern("alice");
        let c = table.intern("bob");

        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);

        // Interned and non-interned symbols still compare by content
        assert_eq!(a, Symbol::from("alice"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_accepts_well_formed_terms() -> anyhow::Result<()> {
        let json = r#"{"Compound":{"functor":"link","args":[{"Const":"a"},{"Var":"X"}]}}"#;
        let term: Term = serde_json::from_str(json)?;
        assert_eq!(term, Term::apply("link", [Term::symbol("a"), Term::symbol("X")]));
        assert_eq!(serde_json::to_string(&term)?, json);
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_kind_that_disagrees_with_name() {
        // An uppercase constant would pass as ground while reading as a variable
        assert!(serde_json::from_str::<Term>(r#"{"Const":"X"}"#).is_err());
        assert!(serde_json::from_str::<Term>(r#"{"Var":"bob"}"#).is_err());

        let nested = r#"{"Compound":{"functor":"p","args":[{"Const":"X"}]}}"#;
        assert!(serde_json::from_str::<Term>(nested).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_empty_compound() {
        let err = serde_json::from_str::<Term>(r#"{"Compound":{"functor":"f","args":[]}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("malformed term `f()`"), "{err}");
    }
}
