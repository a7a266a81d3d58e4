//! Trigger condition mini-language.
//!
//! Case content gates secrets, triggers, and dialogue behind small boolean
//! expressions like `evidence:frost_pattern OR trust>70 AND evidence_count>=3`.
//! Sources are parsed once at case-load time; a malformed expression aborts
//! the load rather than surfacing mid-game.
//!
//! Connectives fold strictly left-to-right with no precedence or grouping:
//! `A OR B AND C` means `(A OR B) AND C`. Existing case content depends on
//! this order, so it is preserved as-is rather than corrected to standard
//! boolean precedence.

use crate::casefile::EvidenceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for condition parsing.
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("empty condition expression")]
    Empty,
    #[error("expected an atom, found `{0}`")]
    ExpectedAtom(String),
    #[error("expected AND or OR, found `{0}`")]
    ExpectedConnective(String),
    #[error("dangling `{0}` at end of expression")]
    DanglingConnective(String),
    #[error("missing evidence id in `{0}`")]
    MissingEvidenceId(String),
    #[error("invalid comparison in `{0}`")]
    InvalidComparison(String),
}

/// Comparison operators usable in `trust` and `evidence_count` atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl CompareOp {
    /// Check the comparison against a left- and right-hand value.
    pub fn holds<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match self {
            CompareOp::Greater => lhs > rhs,
            CompareOp::GreaterOrEqual => lhs >= rhs,
            CompareOp::Less => lhs < rhs,
            CompareOp::LessOrEqual => lhs <= rhs,
            CompareOp::Equal => lhs == rhs,
            CompareOp::NotEqual => lhs != rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The state a condition is evaluated against.
///
/// Implemented by [`crate::state::CaseState`]; tests and callers can supply
/// their own snapshots.
pub trait EvalContext {
    fn has_evidence(&self, id: &EvidenceId) -> bool;
    fn trust(&self) -> i32;
    fn evidence_count(&self) -> usize;
}

/// A single testable fact about game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionAtom {
    /// `evidence:<id>` — the evidence id has been discovered.
    EvidencePresent(EvidenceId),
    /// `trust<op><int>` — compare current trust against a literal.
    TrustCompare(CompareOp, i32),
    /// `evidence_count<op><int>` — compare total discovered evidence.
    EvidenceCountCompare(CompareOp, usize),
}

impl ConditionAtom {
    pub fn evaluate(&self, ctx: &impl EvalContext) -> bool {
        match self {
            ConditionAtom::EvidencePresent(id) => ctx.has_evidence(id),
            ConditionAtom::TrustCompare(op, value) => op.holds(ctx.trust(), *value),
            ConditionAtom::EvidenceCountCompare(op, value) => {
                op.holds(ctx.evidence_count(), *value)
            }
        }
    }
}

impl fmt::Display for ConditionAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionAtom::EvidencePresent(id) => write!(f, "evidence:{id}"),
            ConditionAtom::TrustCompare(op, value) => write!(f, "trust{op}{value}"),
            ConditionAtom::EvidenceCountCompare(op, value) => {
                write!(f, "evidence_count{op}{value}")
            }
        }
    }
}

/// A parsed condition expression.
///
/// The tree is left-associative by construction, which is what makes the
/// fold order stable: `Display` renders a flat source string that re-parses
/// to the identical tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionExpression {
    Atom(ConditionAtom),
    And(Box<ConditionExpression>, Box<ConditionExpression>),
    Or(Box<ConditionExpression>, Box<ConditionExpression>),
}

impl ConditionExpression {
    /// Parse a condition source string.
    ///
    /// Tokens are whitespace-delimited. Connectives are case-insensitive;
    /// evidence ids are case-sensitive.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let mut tokens = source.split_whitespace();

        let first = tokens.next().ok_or(ConditionError::Empty)?;
        let mut expr = ConditionExpression::Atom(parse_atom(first)?);

        while let Some(connective) = tokens.next() {
            let joiner = if connective.eq_ignore_ascii_case("AND") {
                ConditionExpression::And
            } else if connective.eq_ignore_ascii_case("OR") {
                ConditionExpression::Or
            } else {
                return Err(ConditionError::ExpectedConnective(connective.to_string()));
            };

            let next = tokens
                .next()
                .ok_or_else(|| ConditionError::DanglingConnective(connective.to_string()))?;
            let atom = ConditionExpression::Atom(parse_atom(next)?);
            expr = joiner(Box::new(expr), Box::new(atom));
        }

        Ok(expr)
    }

    /// Evaluate against a state snapshot.
    ///
    /// Total and panic-free: every parseable expression evaluates.
    pub fn evaluate(&self, ctx: &impl EvalContext) -> bool {
        match self {
            ConditionExpression::Atom(atom) => atom.evaluate(ctx),
            ConditionExpression::And(lhs, rhs) => lhs.evaluate(ctx) && rhs.evaluate(ctx),
            ConditionExpression::Or(lhs, rhs) => lhs.evaluate(ctx) || rhs.evaluate(ctx),
        }
    }
}

fn parse_atom(token: &str) -> Result<ConditionAtom, ConditionError> {
    if let Some(id) = token.strip_prefix("evidence:") {
        if id.is_empty() {
            return Err(ConditionError::MissingEvidenceId(token.to_string()));
        }
        return Ok(ConditionAtom::EvidencePresent(EvidenceId::new(id)));
    }

    // Checked before `trust` since both are bare prefixes of their token.
    if let Some(rest) = token.strip_prefix("evidence_count") {
        let (op, value) = parse_comparison(token, rest)?;
        let value: usize = value
            .parse()
            .map_err(|_| ConditionError::InvalidComparison(token.to_string()))?;
        return Ok(ConditionAtom::EvidenceCountCompare(op, value));
    }

    if let Some(rest) = token.strip_prefix("trust") {
        let (op, value) = parse_comparison(token, rest)?;
        let value: i32 = value
            .parse()
            .map_err(|_| ConditionError::InvalidComparison(token.to_string()))?;
        return Ok(ConditionAtom::TrustCompare(op, value));
    }

    Err(ConditionError::ExpectedAtom(token.to_string()))
}

fn parse_comparison<'a>(
    token: &str,
    rest: &'a str,
) -> Result<(CompareOp, &'a str), ConditionError> {
    // Two-character operators must be tried first or `>=` parses as `>` `=`.
    const OPS: [(&str, CompareOp); 6] = [
        (">=", CompareOp::GreaterOrEqual),
        ("<=", CompareOp::LessOrEqual),
        ("==", CompareOp::Equal),
        ("!=", CompareOp::NotEqual),
        (">", CompareOp::Greater),
        ("<", CompareOp::Less),
    ];

    for (symbol, op) in OPS {
        if let Some(value) = rest.strip_prefix(symbol) {
            return Ok((op, value));
        }
    }

    Err(ConditionError::InvalidComparison(token.to_string()))
}

impl FromStr for ConditionExpression {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionExpression::parse(s)
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpression::Atom(atom) => write!(f, "{atom}"),
            ConditionExpression::And(lhs, rhs) => write!(f, "{lhs} AND {rhs}"),
            ConditionExpression::Or(lhs, rhs) => write!(f, "{lhs} OR {rhs}"),
        }
    }
}
