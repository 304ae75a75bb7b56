//! `!hello`.

use impbot_core::{HandlerResult, Message};
use impbot_framework::{CommandHandler, CommandRegistry, CommandResult, Commands};

/// Answers `!hello`.
#[derive(Debug, Default)]
pub struct Hello;

/// [`Hello`] ready to register.
pub type HelloHandler = CommandHandler<Hello>;

impl Hello {
    /// Builds the handler.
    pub fn handler() -> CommandResult<HelloHandler> {
        CommandHandler::new(Self)
    }

    fn hello(&mut self, _message: &Message) -> HandlerResult {
        Ok(Some("Hello, world!".to_string()))
    }
}

impl Commands for Hello {
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
        commands.command("hello", &[], Self::hello)?;
        Ok(())
    }
}
