//! Condition evaluation for `_switch` nodes.

use std::collections::BTreeMap;

use marigold_graph::DATA_INPUT;
use minijinja::Environment;
use serde_json::Value;

/// Errors from evaluating a condition.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
  #[error("invalid expression: {0}")]
  Expression(#[from] minijinja::Error),

  #[error("result is not representable as JSON: {0}")]
  Conversion(#[from] serde_json::Error),

  #[error("{0}")]
  Other(String),
}

/// Evaluates a condition expression against the `_switch` discriminant.
pub trait ConditionEvaluator: Send + Sync {
  /// Evaluate `expression` with `data` in scope. The engine applies
  /// [`truthy`] to the result.
  fn evaluate(&self, data: &Value, expression: &str) -> Result<Value, ConditionError>;
}

/// Conditions written as minijinja expressions, e.g. `data == "b"` or
/// `data.count > 3 and data.enabled`.
///
/// Any free name other than `data` evaluates to itself as a string, so
/// `data==b` compares against the literal `"b"`.
pub struct JinjaConditions {
  env: Environment<'static>,
}

impl JinjaConditions {
  pub fn new() -> Self {
    Self {
      env: Environment::new(),
    }
  }

  fn is_global(&self, name: &str) -> bool {
    self.env.globals().any(|(global, _)| global == name)
  }
}

impl Default for JinjaConditions {
  fn default() -> Self {
    Self::new()
  }
}

impl ConditionEvaluator for JinjaConditions {
  fn evaluate(&self, data: &Value, expression: &str) -> Result<Value, ConditionError> {
    let expr = self.env.compile_expression(expression)?;

    let mut ctx: BTreeMap<String, minijinja::Value> = expr
      .undeclared_variables(false)
      .into_iter()
      .filter(|name| name != DATA_INPUT && !self.is_global(name))
      .map(|name| {
        let literal = minijinja::Value::from(name.as_str());
        (name, literal)
      })
      .collect();
    ctx.insert(DATA_INPUT.to_string(), minijinja::Value::from_serialize(data));

    let result = expr.eval(ctx)?;
    Ok(serde_json::to_value(&result)?)
  }
}

/// Boolean reading of an evaluated condition.
///
/// Booleans as is, numbers when non-zero, strings when they spell a true
/// literal: `1`, `t`, `T`, `true`, `True` or `TRUE`. Everything else is false.
pub fn truthy(value: &Value) -> bool {
  match value {
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => matches!(s.as_str(), "1" | "t" | "T" | "true" | "True" | "TRUE"),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_equality_against_data() {
    let conditions = JinjaConditions::new();
    assert_eq!(conditions.evaluate(&json!("b"), r#"data == "b""#).unwrap(), json!(true));
    assert_eq!(conditions.evaluate(&json!("a"), r#"data == "b""#).unwrap(), json!(false));
  }

  #[test]
  fn test_nested_fields() {
    let conditions = JinjaConditions::new();
    let data = json!({"count": 5, "enabled": true});
    let result = conditions
      .evaluate(&data, "data.count > 3 and data.enabled")
      .unwrap();
    assert!(truthy(&result));

    let missing = conditions.evaluate(&data, "data.absent").unwrap();
    assert!(!truthy(&missing));
  }

  #[test]
  fn test_bare_words_compare_as_strings() {
    let conditions = JinjaConditions::new();
    assert_eq!(conditions.evaluate(&json!("b"), "data==b").unwrap(), json!(true));
    assert_eq!(conditions.evaluate(&json!("b"), "data==a").unwrap(), json!(false));
    assert_eq!(
      conditions.evaluate(&json!("openai"), "data==openai").unwrap(),
      json!(true)
    );
  }

  #[test]
  fn test_globals_are_not_shadowed() {
    let conditions = JinjaConditions::new();
    let result = conditions.evaluate(&json!(2), "data in range(3)").unwrap();
    assert_eq!(result, json!(true));
  }

  #[test]
  fn test_syntax_error() {
    let conditions = JinjaConditions::new();
    let err = conditions.evaluate(&json!(1), "data ==").unwrap_err();
    assert!(matches!(err, ConditionError::Expression(_)));
  }

  #[test]
  fn test_truthy() {
    assert!(truthy(&json!(true)));
    assert!(!truthy(&json!(false)));
    assert!(truthy(&json!(2)));
    assert!(truthy(&json!(-0.5)));
    assert!(!truthy(&json!(0)));
    assert!(truthy(&json!("TRUE")));
    assert!(truthy(&json!("True")));
    assert!(truthy(&json!("t")));
    assert!(truthy(&json!("T")));
    assert!(truthy(&json!("1")));
    assert!(!truthy(&json!("tRuE")));
    assert!(!truthy(&json!(" true ")));
    assert!(!truthy(&json!("yes")));
    assert!(!truthy(&json!(null)));
    assert!(!truthy(&json!([1])));
    assert!(!truthy(&json!({"a": 1})));
  }
}
