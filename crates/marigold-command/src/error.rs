use thiserror::Error;

/// Errors a command can return.
#[derive(Debug, Error)]
pub enum CommandError {
  /// The node was never meant to run (e.g. it sits behind an unselected
  /// branch). Not a failure: the engine records it as unreachable and the
  /// consumer sees no value.
  #[error("node unreachable")]
  Unreachable,

  /// The command observed cancellation and stopped.
  #[error("command cancelled")]
  Cancelled,

  /// Missing required input field.
  #[error("missing required input: {field}")]
  MissingInput { field: String },

  /// Invalid input value.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// Command-specific failure.
  #[error("{message}")]
  Failed { message: String },

  /// Another command error with added context.
  #[error("{context}: {source}")]
  Context {
    context: String,
    #[source]
    source: Box<CommandError>,
  },

  /// Any other error raised inside a command.
  #[error("{source}")]
  Other {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl CommandError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  pub fn missing_input(field: impl Into<String>) -> Self {
    Self::MissingInput {
      field: field.into(),
    }
  }

  pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidInput {
      field: field.into(),
      message: message.into(),
    }
  }

  /// Wrap a foreign error.
  pub fn other(source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Other {
      source: Box::new(source),
    }
  }

  /// Prefix this error with context, keeping it as the source.
  pub fn context(self, context: impl Into<String>) -> Self {
    Self::Context {
      context: context.into(),
      source: Box::new(self),
    }
  }

  /// Whether an [`CommandError::Unreachable`] sits anywhere in the source chain.
  ///
  /// Matches on the variant, never on the message, so the tag survives any
  /// number of `context` or `other` wrappers.
  pub fn is_unreachable(&self) -> bool {
    self.any_in_chain(|err| matches!(err, CommandError::Unreachable))
  }

  /// Whether a [`CommandError::Cancelled`] sits anywhere in the source chain.
  pub fn is_cancelled(&self) -> bool {
    self.any_in_chain(|err| matches!(err, CommandError::Cancelled))
  }

  fn any_in_chain(&self, pred: impl Fn(&CommandError) -> bool) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
    while let Some(err) = current {
      if err.downcast_ref::<CommandError>().is_some_and(&pred) {
        return true;
      }
      current = err.source();
    }
    false
  }
}
