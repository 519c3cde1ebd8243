use std::collections::HashMap;
use std::sync::Arc;

use crate::command::Command;

/// Lookup of commands by name.
///
/// The engine only reads from a registry; how commands get there (static
/// registration, plugins, compiled user scripts) is up to the host.
pub trait CommandRegistry: Send + Sync {
  /// Get a command by name.
  fn get(&self, name: &str) -> Option<Arc<dyn Command>>;

  /// Whether a command is registered under `name`.
  fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }
}

/// In-memory registry keyed by command name.
#[derive(Clone, Default)]
pub struct CommandSet {
  commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a command, replacing any previous one with the same name.
  pub fn register(&mut self, name: impl Into<String>, command: impl Command + 'static) {
    self.commands.insert(name.into(), Arc::new(command));
  }

  /// Builder form of [`CommandSet::register`].
  pub fn with(mut self, name: impl Into<String>, command: impl Command + 'static) -> Self {
    self.register(name, command);
    self
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.commands.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    names
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }
}

impl CommandRegistry for CommandSet {
  fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
    self.commands.get(name).cloned()
  }

  fn contains(&self, name: &str) -> bool {
    self.commands.contains_key(name)
  }
}

impl<R: CommandRegistry + ?Sized> CommandRegistry for Arc<R> {
  fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
    (**self).get(name)
  }

  fn contains(&self, name: &str) -> bool {
    (**self).contains(name)
  }
}

impl std::fmt::Debug for CommandSet {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CommandSet")
      .field("commands", &self.names())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{CommandContext, FnCommand, Outputs};

  fn echo() -> impl Command {
    FnCommand::new(|_: &CommandContext, inputs: Outputs| Ok(inputs))
  }

  #[test]
  fn test_register_and_get() {
    let set = CommandSet::new().with("echo", echo()).with("again", echo());

    assert_eq!(set.len(), 2);
    assert!(set.contains("echo"));
    assert!(set.get("echo").is_some());
    assert!(set.get("missing").is_none());
    assert_eq!(set.names(), vec!["again", "echo"]);
  }

  #[test]
  fn test_shared_registry() {
    let shared: Arc<CommandSet> = Arc::new(CommandSet::new().with("echo", echo()));
    assert!(shared.contains("echo"));
    assert!(!shared.contains("other"));
  }
}
