use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// Immutable key/value overlay scoped to one iteration context.
///
/// Values are layered onto a node's assembled inputs last, so they win over
/// same-keyed anchor results. Extending an overlay returns a new one; the
/// original stays untouched for sibling iterations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inject {
  values: Arc<BTreeMap<String, Value>>,
}

impl Inject {
  pub fn new() -> Self {
    Self::default()
  }

  /// A new overlay with `key` bound to `value`.
  pub fn with(&self, key: impl Into<String>, value: Value) -> Self {
    let mut values = (*self.values).clone();
    values.insert(key.into(), value);
    Self {
      values: Arc::new(values),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.values.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_with_does_not_mutate_parent() {
    let root = Inject::new();
    let outer = root.with("item", json!(1));
    let inner = outer.with("item", json!(2)).with("index", json!(0));

    assert!(root.is_empty());
    assert_eq!(outer.get("item"), Some(&json!(1)));
    assert_eq!(outer.len(), 1);
    assert_eq!(inner.get("item"), Some(&json!(2)));
    assert_eq!(inner.len(), 2);
  }

  #[test]
  fn test_iter_is_key_ordered() {
    let inject = Inject::new().with("b", json!(2)).with("a", json!(1));
    let keys: Vec<&String> = inject.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b"]);
  }
}
