//! Chat commands.
//!
//! A message whose first token is `!name` for a registered name runs that
//! command. The rest of the line is split on whitespace into exactly as many
//! tokens as the command function has parameters, the last token keeping any
//! embedded whitespace, and each token is converted to its declared
//! [`CommandArg`] type. Conversion failures and missing required arguments
//! produce a usage reply instead of running the function.
//!
//! - [`split`] - Splitting a line into command, arguments and tokens
//! - [`arg`] - Argument kinds and conversions
//! - [`registry`] - Command tables and typed command functions
//! - [`handler`] - [`CommandHandler`], which turns a [`Commands`] type into a
//!   [`Handler`](crate::Handler)

pub mod arg;
pub mod handler;
pub mod registry;
pub mod split;

pub use arg::{ArgError, ArgKind, CommandArg, Either};
pub use handler::{CommandHandler, Commands};
pub use registry::{COMMAND_MARKER, Command, CommandFn, CommandRegistry, with_marker};
pub use split::{split_args, split_command};
