//! Marigold Command
//!
//! The seam between the engine and the capabilities flow nodes invoke.
//! A [`Command`] receives fully resolved inputs plus a [`CommandContext`]
//! and returns an output map. Commands are looked up by name through a
//! [`CommandRegistry`]; [`CommandSet`] is the in-memory implementation.
//!
//! Returning [`CommandError::Unreachable`] (possibly wrapped) tells the
//! engine the node was never meant to run, as opposed to having failed.

mod command;
mod error;
mod registry;

pub use command::{Command, CommandContext, FnCommand, Outputs};
pub use error::CommandError;
pub use registry::{CommandRegistry, CommandSet};
