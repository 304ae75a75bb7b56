//! Command tables.
//!
//! Commands are registered explicitly when a handler is built:
//!
//! ```rust,ignore
//! fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
//!     commands.command("roulette", &["points"], Self::roulette)?;
//!     commands
//!         .command("resetcount", &["name", "count"], Self::reset_count)?
//!         .usage("!resetcount <name> [<count>]");
//!     Ok(())
//! }
//! ```
//!
//! A command function takes the handler, the triggering [`Message`], and one
//! [`CommandArg`] per named parameter. The message is never parsed from text.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use impbot_core::{HandlerError, HandlerResult, Message};
use tracing::debug;

use super::arg::{ArgError, ArgKind, CommandArg};
use super::split::split_args;
use crate::error::{CommandError, CommandResult};

/// Prefix every chat command starts with.
pub const COMMAND_MARKER: char = '!';

/// Adds the marker to a bare command name.
pub fn with_marker(name: &str) -> String {
    format!("{COMMAND_MARKER}{}", name.trim_start_matches(COMMAND_MARKER))
}

// ============================================================================
// Command Functions
// ============================================================================

/// A function callable as a command.
///
/// Implemented for every `Fn(&mut H, &Message, A1, .., An) -> HandlerResult`
/// with up to six [`CommandArg`] parameters.
pub trait CommandFn<H, Args>: Send + 'static {
    /// Kinds of the parsed parameters, in order.
    fn params() -> Vec<ArgKind>;

    /// Parses `argstring` and calls the function.
    fn apply(
        &self,
        target: &mut H,
        message: &Message,
        argstring: &str,
    ) -> Result<HandlerResult, ArgError>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

/// Generates [`CommandFn`] implementations for functions with different arities.
macro_rules! impl_command_fn {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<H, F, $($ty,)*> CommandFn<H, ($($ty,)*)> for F
        where
            F: Fn(&mut H, &Message $(, $ty)*) -> HandlerResult + Send + 'static,
            $( $ty: CommandArg, )*
        {
            fn params() -> Vec<ArgKind> {
                vec![$($ty::kind()),*]
            }

            fn apply(
                &self,
                target: &mut H,
                message: &Message,
                argstring: &str,
            ) -> Result<HandlerResult, ArgError> {
                let mut tokens = split_args(argstring, count!($($ty)*)).into_iter();
                $(
                    let $ty = match tokens.next() {
                        Some(token) => $ty::parse(token)?,
                        None => $ty::absent().ok_or(ArgError::Missing)?,
                    };
                )*

                Ok((self)(target, message $(, $ty)*))
            }
        }
    };
}

impl_command_fn!();
impl_command_fn!(T1);
impl_command_fn!(T1, T2);
impl_command_fn!(T1, T2, T3);
impl_command_fn!(T1, T2, T3, T4);
impl_command_fn!(T1, T2, T3, T4, T5);
impl_command_fn!(T1, T2, T3, T4, T5, T6);

type ErasedCommandFn<H> =
    Box<dyn Fn(&mut H, &Message, &str) -> Result<HandlerResult, ArgError> + Send>;

// ============================================================================
// Command
// ============================================================================

/// One registered command.
pub struct Command<H> {
    name: String,
    params: Vec<(String, ArgKind)>,
    usage: Option<String>,
    func: ErasedCommandFn<H>,
}

impl<H> Command<H> {
    /// The command, marker included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names and kinds.
    pub fn params(&self) -> &[(String, ArgKind)] {
        &self.params
    }

    /// Replaces the generated usage string.
    pub fn usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = Some(usage.into());
        self
    }

    /// The usage string: the one given, or `!name <required> [<optional>]`.
    pub fn usage_text(&self) -> String {
        if let Some(usage) = &self.usage {
            return usage.clone();
        }
        let mut text = self.name.clone();
        for (name, kind) in &self.params {
            if kind.is_optional() {
                let _ = write!(text, " [<{name}>]");
            } else {
                let _ = write!(text, " <{name}>");
            }
        }
        text
    }

    /// Parses the arguments and runs the command.
    ///
    /// Bad or missing arguments, and user errors with no text, become a
    /// [`HandlerError::Usage`].
    pub fn invoke(&self, target: &mut H, message: &Message, argstring: &str) -> HandlerResult {
        match (self.func)(target, message, argstring) {
            Ok(Err(HandlerError::User(text))) if text.is_empty() => {
                Err(HandlerError::usage(self.usage_text()))
            }
            Ok(result) => result,
            Err(e) => {
                debug!(command = %self.name, error = %e, "Rejected command arguments");
                Err(HandlerError::usage(self.usage_text()))
            }
        }
    }
}

impl<H> std::fmt::Debug for Command<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("usage", &self.usage)
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The commands of one handler type.
pub struct CommandRegistry<H> {
    handler: &'static str,
    commands: BTreeMap<String, Command<H>>,
}

impl<H: 'static> CommandRegistry<H> {
    /// Creates an empty registry for handler type `H`.
    pub fn new() -> Self {
        Self {
            handler: std::any::type_name::<H>(),
            commands: BTreeMap::new(),
        }
    }

    /// Registers `func` as `!name`.
    ///
    /// `params` names the parsed parameters, for the usage string; there must
    /// be exactly one name per argument after the message.
    pub fn command<A, F>(
        &mut self,
        name: &str,
        params: &[&str],
        func: F,
    ) -> CommandResult<&mut Command<H>>
    where
        A: 'static,
        F: CommandFn<H, A>,
    {
        let bare = name.trim_start_matches(COMMAND_MARKER);
        if bare.is_empty() || bare.contains(char::is_whitespace) {
            return Err(CommandError::InvalidName(name.to_string()));
        }
        let name = with_marker(bare);

        let kinds = F::params();
        if kinds.len() != params.len() {
            return Err(CommandError::ParamCount {
                command: name,
                named: params.len(),
                expected: kinds.len(),
            });
        }
        if self.commands.contains_key(&name) {
            return Err(CommandError::Duplicate {
                handler: self.handler,
                command: name,
            });
        }

        let command = Command {
            name: name.clone(),
            params: params
                .iter()
                .map(|p| p.to_string())
                .zip(kinds)
                .collect(),
            usage: None,
            func: Box::new(move |target: &mut H, message: &Message, argstring: &str| {
                func.apply(target, message, argstring)
            }),
        };
        Ok(self.commands.entry(name).or_insert(command))
    }

    /// Looks up a command by its marked name.
    pub fn get(&self, name: &str) -> Option<&Command<H>> {
        self.commands.get(name)
    }

    /// Whether `name` (marker included) is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All registered names, marker included, sorted.
    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<H: 'static> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
