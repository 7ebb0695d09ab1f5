//! Datalog program text.
//!
//! ```text
//! % facts
//! link(a, b).
//! link(b, c).
//!
//! % rules
//! reachable(X, Y) :- link(X, Y).
//! reachable(X, Y) :- link(X, Z), reachable(Z, Y).
//! ```
//!
//! Names are runs of letters, digits and `_`; uppercase-initial names are
//! variables. `%` starts a comment that runs to the end of the line.

use crate::engine::{Engine, Rule};
use crate::error::{EngineError, Result};
use crate::term::Term;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{all_consuming, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

/// A top-level clause of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `head.`
    Fact(Term),
    /// `head :- body.`
    Rule(Rule),
}

/// Parses a single term, e.g. `link(a, X)`; a trailing `.` is allowed
///
/// # Errors
///
/// [`EngineError::Parse`] with the offending position
pub fn parse_term(text: &str) -> Result<Term> {
    all_consuming(terminated(term, pair(opt(token(char('.'))), skip)))(text)
        .map(|(_, term)| term)
        .map_err(|err| parse_error(text, &err))
}

/// Parses a single rule, e.g. `path(X, Y) :- link(X, Y).`
///
/// # Errors
///
/// [`EngineError::Parse`] for malformed text or a fact
pub fn parse_rule(text: &str) -> Result<Rule> {
    let statement = all_consuming(terminated(statement, skip))(text)
        .map(|(_, statement)| statement)
        .map_err(|err| parse_error(text, &err))?;
    match statement {
        Statement::Rule(rule) => Ok(rule),
        Statement::Fact(fact) => Err(EngineError::Parse {
            message: format!("expected a rule, found fact `{fact}`"),
        }),
    }
}

/// Parses a whole program into its statements, in order
///
/// # Errors
///
/// [`EngineError::Parse`] pointing at the first statement that does not parse
pub fn parse_program(text: &str) -> Result<Vec<Statement>> {
    all_consuming(terminated(many0(statement), skip))(text)
        .map(|(_, statements)| statements)
        .map_err(|err| parse_error(text, &err))
}

impl Engine {
    /// Parses `text` and asserts/defines its statements in order
    ///
    /// # Errors
    ///
    /// Parse errors are reported before anything is added. Otherwise the first
    /// failing assertion or definition is returned; earlier statements stay.
    pub fn load(&mut self, text: &str) -> Result<()> {
        for statement in parse_program(text)? {
            match statement {
                Statement::Fact(fact) => {
                    self.assert_fact(fact)?;
                }
                Statement::Rule(rule) => self.define_rule(rule)?,
            }
        }
        Ok(())
    }
}

/// Whitespace and `%` comments
fn skip(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('%'), not_line_ending)),
        ))),
    )(input)
}

fn token<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: Parser<&'a str, O, nom::error::Error<&'a str>>,
{
    preceded(skip, inner)
}

fn name(input: &str) -> IResult<&str, &str> {
    token(take_while1(|c: char| c.is_alphanumeric() || c == '_'))(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    let (input, functor) = name(input)?;
    let (input, args) = opt(delimited(
        token(char('(')),
        separated_list1(token(char(',')), term),
        token(char(')')),
    ))(input)?;

    let term = match args {
        Some(args) => Term::apply(functor, args),
        None => Term::symbol(functor),
    };
    Ok((input, term))
}

fn statement(input: &str) -> IResult<&str, Statement> {
    let (input, head) = term(input)?;
    let (input, body) = opt(preceded(
        token(tag(":-")),
        separated_list1(token(char(',')), term),
    ))(input)?;
    let (input, _) = token(char('.'))(input)?;

    let statement = match body {
        Some(body) => Statement::Rule(Rule::new(head, body)),
        None => Statement::Fact(head),
    };
    Ok((input, statement))
}

fn parse_error(text: &str, err: &nom::Err<nom::error::Error<&str>>) -> EngineError {
    let message = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // The remaining input is always a suffix of `text`
            let offset = text.len() - e.input.len();
            let consumed = &text[..offset];
            let line = consumed.matches('\n').count() + 1;
            let column = offset - consumed.rfind('\n').map_or(0, |i| i + 1) + 1;
            let near: String = e.input.chars().take(20).collect();
            format!("unexpected input at line {line}, column {column}: `{near}`")
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    };
    EngineError::Parse { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms() -> anyhow::Result<()> {
        assert_eq!(parse_term("bob")?, Term::symbol("bob"));
        assert_eq!(parse_term("X")?, Term::symbol("X"));
        assert_eq!(
            parse_term(" link( a ,X ) ")?,
            Term::apply("link", [Term::symbol("a"), Term::symbol("X")])
        );
        assert_eq!(
            parse_term("owns(bob, car(red)).")?.to_string(),
            "owns(bob, car(red))"
        );
        Ok(())
    }

    #[test]
    fn test_parse_rule() -> anyhow::Result<()> {
        let rule = parse_rule("reachable(X, Y) :- link(X, Z), reachable(Z, Y).")?;
        assert_eq!(rule.head, parse_term("reachable(X, Y)")?);
        assert_eq!(rule.body.len(), 2);
        assert_eq!(
            rule.to_string(),
            "reachable(X, Y) :- link(X, Z), reachable(Z, Y)."
        );

        assert!(matches!(
            parse_rule("link(a, b)."),
            Err(EngineError::Parse { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_parse_program_with_comments() -> anyhow::Result<()> {
        let statements = parse_program(
            "% graph\n\
             link(a, b). link(b, c).\n\
             reachable(X, Y) :- link(X, Y). % base case\n",
        )?;
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[0], Statement::Fact(_)));
        assert!(matches!(statements[2], Statement::Rule(_)));

        assert!(parse_program("")?.is_empty());
        assert!(parse_program("  % only a comment")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse_program("link(a, b).\nlink(b c).\n").unwrap_err();
        let EngineError::Parse { message } = err else {
            panic!("expected a parse error");
        };
        assert!(message.starts_with("unexpected input at line 2, column 1"), "{message}");

        assert!(parse_term("link(a,").is_err());
        assert!(parse_term("link()").is_err());
        assert!(parse_term("a b").is_err());
    }

    #[test]
    fn test_load_program_into_engine() -> anyhow::Result<()> {
        let mut engine = Engine::new();
        engine.load(
            "link(a, b). link(b, c). link(c, c). link(c, d). link(d, e).\n\
             reachable(X, Y) :- link(X, Y).\n\
             reachable(X, Y) :- link(X, Z), reachable(Z, Y).\n",
        )?;

        assert_eq!(engine.rules().len(), 2);
        assert_eq!(engine.query(&parse_term("reachable(X, e)")?).count(), 4);
        assert!(engine.ask(&parse_term("reachable(a, e)")?));
        Ok(())
    }

    #[test]
    fn test_load_rejects_non_ground_fact() {
        let mut engine = Engine::new();
        let err = engine.load("person(X).").unwrap_err();
        assert!(matches!(err, EngineError::NonGroundFact { .. }));
    }
}
