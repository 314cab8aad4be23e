//! Default evaluator: variables, fixture members and JSON navigation.

use super::expression::{parse, Expr, Statement};
use super::{EvaluationError, Evaluator, EvaluatorFactory};
use crate::fixture::Fixture;
use crate::value::{self, Value};
use std::collections::BTreeMap;

/// Evaluator over a [`Fixture`] with a flat variable scope.
///
/// Variables live for the whole run; setting a name twice keeps the last
/// value written in document order.
pub struct SimpleEvaluator<'f> {
    fixture: &'f mut dyn Fixture,
    variables: BTreeMap<String, Value>,
}

impl std::fmt::Debug for SimpleEvaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleEvaluator")
            .field("fixture", &self.fixture.name())
            .field("variables", &self.variables)
            .finish()
    }
}

impl<'f> SimpleEvaluator<'f> {
    /// Bind to a fixture
    pub fn new(fixture: &'f mut dyn Fixture) -> Self {
        Self {
            fixture,
            variables: BTreeMap::new(),
        }
    }

    fn eval(&mut self, source: &str, expr: &Expr) -> Result<Value, EvaluationError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Variable(name) => {
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvaluationError::TargetNotFound {
                        expression: source.to_string(),
                        target: format!("#{name}"),
                    })
            }
            Expr::Property(name) => self
                .fixture
                .property(name)
                .map_err(|e| EvaluationError::from_fixture(source, e)),
            Expr::Call { method, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(source, a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.fixture
                    .call(method, &args)
                    .map_err(|e| EvaluationError::from_fixture(source, e))
            }
            Expr::Field { target, field } => {
                let target = self.eval(source, target)?;
                field_of(&target, field).ok_or_else(|| EvaluationError::TargetNotFound {
                    expression: source.to_string(),
                    target: field.clone(),
                })
            }
            Expr::Index { target, index } => {
                let target = self.eval(source, target)?;
                let index = self.eval(source, index)?;
                let found = match (&target, &index) {
                    (Value::Array(items), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.get(i).cloned()),
                    (Value::Object(map), Value::String(key)) => map.get(key).cloned(),
                    _ => None,
                };
                found.ok_or_else(|| EvaluationError::TargetNotFound {
                    expression: source.to_string(),
                    target: format!("[{}]", value::describe(&index)),
                })
            }
        }
    }
}

fn field_of(target: &Value, field: &str) -> Option<Value> {
    match (target, field) {
        (Value::Object(map), _) => map.get(field).cloned(),
        (Value::Array(items), "length" | "size") => Some(Value::from(items.len())),
        (Value::String(s), "length") => Some(Value::from(s.chars().count())),
        _ => None,
    }
}

impl Evaluator for SimpleEvaluator<'_> {
    fn evaluate(&mut self, expression: &str) -> Result<Value, EvaluationError> {
        match parse(expression).map_err(|m| EvaluationError::syntax(expression, m))? {
            Statement::Assign { variable, value } => {
                let value = self.eval(expression, &value)?;
                self.variables.insert(variable, value.clone());
                Ok(value)
            }
            Statement::Eval(expr) => self.eval(expression, &expr),
        }
    }

    fn evaluate_and_set(&mut self, expression: &str, value: Value) -> Result<(), EvaluationError> {
        match parse(expression).map_err(|m| EvaluationError::syntax(expression, m))? {
            Statement::Eval(Expr::Variable(name)) => {
                self.variables.insert(name, value);
                Ok(())
            }
            Statement::Eval(Expr::Property(name)) => self
                .fixture
                .set_property(&name, value)
                .map_err(|e| EvaluationError::from_fixture(expression, e)),
            _ => Err(EvaluationError::syntax(
                expression,
                "only '#variable' or a property name can be set",
            )),
        }
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    fn describe(&self, expression: &str) -> String {
        let bound: Vec<String> = self.variables.keys().map(|k| format!("#{k}")).collect();
        format!(
            "'{expression}' on fixture {} (bound: {})",
            self.fixture.name(),
            if bound.is_empty() {
                "none".to_string()
            } else {
                bound.join(", ")
            }
        )
    }
}

/// Factory for [`SimpleEvaluator`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEvaluatorFactory;

impl EvaluatorFactory for SimpleEvaluatorFactory {
    fn create<'f>(&self, fixture: &'f mut dyn Fixture) -> Box<dyn Evaluator + 'f> {
        Box::new(SimpleEvaluator::new(fixture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureError, MethodFixture};
    use serde_json::json;

    fn fixture() -> MethodFixture {
        MethodFixture::new("Calc")
            .with_method("add", |args| {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            })
            .with_method("fail", |_| Err(FixtureError::failed("boom")))
            .with_property("people", json!([{"name": "Ann"}, {"name": "Bob"}]))
    }

    mod evaluation_tests {
        use super::*;

        #[test]
        fn test_assignment_then_variable() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            assert_eq!(e.evaluate("#sum = add(2, 3)").unwrap(), json!(5));
            assert_eq!(e.evaluate("#sum").unwrap(), json!(5));
            assert_eq!(e.variable("sum"), Some(json!(5)));
        }

        #[test]
        fn test_navigation() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            assert_eq!(e.evaluate("people[1].name").unwrap(), json!("Bob"));
            assert_eq!(e.evaluate("people.length").unwrap(), json!(2));
        }

        #[test]
        fn test_last_write_wins() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            e.evaluate_and_set("#x", json!("first")).unwrap();
            e.evaluate_and_set("#x", json!("second")).unwrap();
            assert_eq!(e.evaluate("#x").unwrap(), json!("second"));
        }

        #[test]
        fn test_set_property_through_fixture() {
            let mut f = fixture();
            {
                let mut e = SimpleEvaluator::new(&mut f);
                e.evaluate_and_set("limit", json!(10)).unwrap();
            }
            assert_eq!(f.property_value("limit"), Some(&json!(10)));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_error_kinds_are_distinct() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            assert!(matches!(e.evaluate("add(").unwrap_err(), EvaluationError::Syntax { .. }));
            assert!(matches!(
                e.evaluate("missing()").unwrap_err(),
                EvaluationError::TargetNotFound { .. }
            ));
            assert!(matches!(
                e.evaluate("#unbound").unwrap_err(),
                EvaluationError::TargetNotFound { ref target, .. } if target == "#unbound"
            ));
            assert!(matches!(e.evaluate("fail()").unwrap_err(), EvaluationError::Thrown { .. }));
        }

        #[test]
        fn test_cannot_set_call() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            assert!(matches!(
                e.evaluate_and_set("add()", json!(1)).unwrap_err(),
                EvaluationError::Syntax { .. }
            ));
        }

        #[test]
        fn test_describe_lists_bound_variables() {
            let mut f = fixture();
            let mut e = SimpleEvaluator::new(&mut f);
            e.set_variable("TEXT", json!("x"));
            assert_eq!(e.describe("add()"), "'add()' on fixture Calc (bound: #TEXT)");
        }
    }
}
