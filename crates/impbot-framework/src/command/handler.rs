//! Handlers built from a command table.

use impbot_core::{HandlerError, HandlerResult, Message};
use tracing::trace;

use super::registry::CommandRegistry;
use super::split::split_command;
use crate::error::CommandResult;
use crate::handler::Handler;

/// A type whose behaviour is a set of chat commands.
///
/// Wrap it in a [`CommandHandler`] to register it with the bot.
pub trait Commands: Send + Sized + 'static {
    /// Registers this type's commands. Called once, by [`CommandHandler::new`].
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()>;

    /// Vets a registered command before it runs. Errors are reported like
    /// errors from the command itself.
    fn authorize(&mut self, message: &Message, command: &str) -> Result<(), HandlerError> {
        let _ = (message, command);
        Ok(())
    }

    /// Claims messages that don't start with a registered command.
    fn check_other(&mut self, message: &Message) -> bool {
        let _ = message;
        false
    }

    /// Handles a message claimed by [`check_other`](Commands::check_other).
    fn run_other(&mut self, message: &Message) -> HandlerResult {
        let _ = message;
        Ok(None)
    }

    /// See [`Handler::startup`].
    fn startup(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Adapts a [`Commands`] type into a [`Handler`] of [`Message`]s.
pub struct CommandHandler<C: Commands> {
    inner: C,
    registry: CommandRegistry<C>,
}

impl<C: Commands> CommandHandler<C> {
    /// Builds the command table for `inner`.
    pub fn new(inner: C) -> CommandResult<Self> {
        let mut registry = CommandRegistry::new();
        C::register(&mut registry)?;
        Ok(Self { inner, registry })
    }

    /// The wrapped value.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The wrapped value, mutably.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// The command table.
    pub fn registry(&self) -> &CommandRegistry<C> {
        &self.registry
    }
}

impl<C: Commands> Handler for CommandHandler<C> {
    type Event = Message;

    fn check(&mut self, message: &Message) -> bool {
        match split_command(&message.text) {
            Some((command, _)) if self.registry.contains(command) => true,
            _ => self.inner.check_other(message),
        }
    }

    fn run(&mut self, message: &Message) -> HandlerResult {
        let command = split_command(&message.text)
            .and_then(|(name, args)| self.registry.get(name).map(|c| (c, args)));
        match command {
            Some((command, args)) => {
                trace!(command = command.name(), user = %message.user, "Running command");
                self.inner.authorize(message, command.name())?;
                command.invoke(&mut self.inner, message, args)
            }
            None => self.inner.run_other(message),
        }
    }

    fn startup(&mut self) -> Result<(), HandlerError> {
        self.inner.startup()
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn commands(&self) -> Vec<String> {
        self.registry.names()
    }
}
