//! Expression evaluation against a fixture.
//!
//! The engine only depends on the [`Evaluator`] contract. One evaluator is
//! created per `process` call by an [`EvaluatorFactory`] and bound to exactly
//! one fixture for that call. [`SimpleEvaluator`] is the default
//! implementation.

mod expression;
mod simple;

pub use expression::{parse, Expr, Statement};
pub use simple::{SimpleEvaluator, SimpleEvaluatorFactory};

use crate::fixture::{Fixture, FixtureError};
use crate::value::Value;
use thiserror::Error;

/// Why an expression could not produce a value.
///
/// Every variant is isolated to the command that evaluated the expression:
/// it is recorded as an exception outcome and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The expression is malformed
    #[error("syntax error in '{expression}': {message}")]
    Syntax {
        /// Offending expression
        expression: String,
        /// Parser message
        message: String,
    },

    /// A referenced variable, property or method does not exist
    #[error("'{target}' not found while evaluating '{expression}'")]
    TargetNotFound {
        /// Offending expression
        expression: String,
        /// Missing member
        target: String,
    },

    /// Evaluated code produced a value of the wrong type
    #[error("expected {expected} from '{expression}' but got {actual}")]
    TypeMismatch {
        /// Offending expression
        expression: String,
        /// Required type
        expected: String,
        /// Produced type and value
        actual: String,
    },

    /// The fixture itself failed
    #[error("{message}")]
    Thrown {
        /// Offending expression
        expression: String,
        /// Failure message
        message: String,
        /// Captured call frames, innermost first
        stack: Vec<String>,
    },
}

impl EvaluationError {
    /// Create a syntax error
    #[must_use]
    pub fn syntax(expression: &str, message: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    /// Create a type mismatch for `actual`
    #[must_use]
    pub fn type_mismatch(expression: &str, expected: &str, actual: &Value) -> Self {
        Self::TypeMismatch {
            expression: expression.to_string(),
            expected: expected.to_string(),
            actual: format!(
                "{} {}",
                crate::value::type_name(actual),
                crate::value::describe(actual)
            ),
        }
    }

    /// Wrap a fixture error raised while evaluating `expression`
    #[must_use]
    pub fn from_fixture(expression: &str, error: FixtureError) -> Self {
        match error {
            FixtureError::MemberNotFound { member } => Self::TargetNotFound {
                expression: expression.to_string(),
                target: member,
            },
            FixtureError::Failed { message, stack } => Self::Thrown {
                expression: expression.to_string(),
                message,
                stack,
            },
        }
    }

    /// Expression that failed
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::Syntax { expression, .. }
            | Self::TargetNotFound { expression, .. }
            | Self::TypeMismatch { expression, .. }
            | Self::Thrown { expression, .. } => expression,
        }
    }

    /// Whether the whole expression is a single unbound `#variable` or a
    /// missing property, as opposed to a missing member deeper inside it.
    #[must_use]
    pub fn is_absent_value(&self) -> bool {
        match self {
            Self::TargetNotFound { expression, target } => expression.trim() == target,
            _ => false,
        }
    }

    /// Captured stack frames (empty unless the fixture threw)
    #[must_use]
    pub fn stack(&self) -> &[String] {
        match self {
            Self::Thrown { stack, .. } => stack,
            _ => &[],
        }
    }

    /// Short kind label used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "ExpressionSyntaxError",
            Self::TargetNotFound { .. } => "TargetNotFoundError",
            Self::TypeMismatch { .. } => "TypeMismatchError",
            Self::Thrown { .. } => "EvaluationException",
        }
    }
}

/// Evaluates expressions against one bound fixture.
pub trait Evaluator {
    /// Evaluate an expression. Assignments (`#var = expr`) bind the variable
    /// and return the assigned value.
    fn evaluate(&mut self, expression: &str) -> Result<Value, EvaluationError>;

    /// Assign `value` to the target named by `expression` (`#var` or a
    /// fixture property).
    fn evaluate_and_set(&mut self, expression: &str, value: Value) -> Result<(), EvaluationError>;

    /// Bind a variable (name without `#`).
    fn set_variable(&mut self, name: &str, value: Value);

    /// Current value of a variable (name without `#`).
    fn variable(&self, name: &str) -> Option<Value>;

    /// Human-readable description of an expression for diagnostics.
    fn describe(&self, expression: &str) -> String;
}

/// Creates an evaluator bound to one fixture for one run.
pub trait EvaluatorFactory {
    /// Bind a fresh evaluator to `fixture`
    fn create<'f>(&self, fixture: &'f mut dyn Fixture) -> Box<dyn Evaluator + 'f>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_error_mapping() {
        let missing = EvaluationError::from_fixture("greet()", FixtureError::member_not_found("greet"));
        assert!(matches!(missing, EvaluationError::TargetNotFound { ref target, .. } if target == "greet"));
        assert_eq!(missing.kind(), "TargetNotFoundError");

        let thrown = EvaluationError::from_fixture(
            "boom()",
            FixtureError::failed("kaboom").with_frame("F.boom"),
        );
        assert_eq!(thrown.to_string(), "kaboom");
        assert_eq!(thrown.stack(), ["F.boom".to_string()]);
        assert_eq!(thrown.expression(), "boom()");
    }

    #[test]
    fn test_absent_value_only_for_whole_expression() {
        let unbound = EvaluationError::TargetNotFound {
            expression: " #never ".to_string(),
            target: "#never".to_string(),
        };
        assert!(unbound.is_absent_value());

        let missing_method = EvaluationError::from_fixture("greet()", FixtureError::member_not_found("greet"));
        assert!(!missing_method.is_absent_value());

        let missing_field = EvaluationError::TargetNotFound {
            expression: "#user.name".to_string(),
            target: "name".to_string(),
        };
        assert!(!missing_field.is_absent_value());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = EvaluationError::type_mismatch("count()", "boolean", &serde_json::json!(3));
        assert_eq!(err.to_string(), "expected boolean from 'count()' but got number 3");
    }
}
