//! Attribute tests carried by conditional edges.
//!
//! A [`Condition`] compares a named attribute (`operand1`) against a literal
//! (`operand2`) using one of five [`Comparator`]s. The literal is kept as a string:
//! it may be numeric or symbolic, and only threshold averaging needs to parse it.

use std::fmt;
use std::str::FromStr;

use crate::error::StructuralViolation;

/// One of the five recognized comparison operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Comparator {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Comparator {
    pub const ALL: [Comparator; 5] = [Comparator::Lt, Comparator::Le, Comparator::Eq, Comparator::Ge, Comparator::Gt];

    /// Returns the literal operator string, as used in the fact encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Eq => "=",
            Comparator::Ge => ">=",
            Comparator::Gt => ">",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = StructuralViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StructuralViolation::UnknownComparator(s.to_string()))
    }
}

/// A predicate `operand1 <comparator> operand2`.
///
/// # Invariants
///
/// - `operand1` names the tested attribute; variable ordering compares these names
///   lexicographically.
/// - `operand2` is never interpreted except by threshold averaging.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Condition {
    pub operand1: String,
    pub operand2: String,
    pub comparator: Comparator,
}

impl Condition {
    pub fn new(operand1: impl Into<String>, comparator: Comparator, operand2: impl Into<String>) -> Self {
        Self {
            operand1: operand1.into(),
            operand2: operand2.into(),
            comparator,
        }
    }

    /// Returns the name of the tested attribute.
    pub fn attribute(&self) -> &str {
        &self.operand1
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.operand1, self.comparator, self.operand2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_roundtrip() {
        for c in Comparator::ALL {
            assert_eq!(c.as_str().parse::<Comparator>(), Ok(c));
        }
    }

    #[test]
    fn test_comparator_unknown() {
        assert_eq!(
            "!=".parse::<Comparator>(),
            Err(StructuralViolation::UnknownComparator("!=".to_string()))
        );
        assert!("".parse::<Comparator>().is_err());
        assert!("=<".parse::<Comparator>().is_err());
    }

    #[test]
    fn test_condition_display() {
        let c = Condition::new("v", Comparator::Le, "5");
        assert_eq!(c.to_string(), "v<=5");
        assert_eq!(c.attribute(), "v");
    }
}
