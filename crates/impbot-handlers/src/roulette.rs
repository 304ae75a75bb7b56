//! `!roulette <points>`: bet stored points on a coin flip.

use impbot_core::{HandlerError, HandlerResult, Message};
use impbot_data::Namespace;
use impbot_framework::{CommandHandler, CommandRegistry, CommandResult, Commands};
use tracing::debug;

/// A source of coin flips. `true` wins.
pub type Coin = Box<dyn FnMut() -> bool + Send>;

/// Per-user point balances and the bet on them.
pub struct Roulette {
    data: Namespace,
    coin: Coin,
}

/// [`Roulette`] ready to register.
pub type RouletteHandler = CommandHandler<Roulette>;

impl Roulette {
    /// A fair coin.
    pub fn new() -> Self {
        Self::with_coin(Box::new(rand::random::<bool>))
    }

    pub fn with_coin(coin: Coin) -> Self {
        Self {
            data: Namespace::of::<Roulette>(),
            coin,
        }
    }

    pub fn handler(self) -> CommandResult<RouletteHandler> {
        CommandHandler::new(self)
    }

    fn roulette(&mut self, message: &Message, points: i64) -> HandlerResult {
        if points <= 0 {
            return Err(HandlerError::user(""));
        }
        let user = message.user.name();
        let starting: i64 = self
            .data
            .get_or(user, "0")?
            .parse()
            .map_err(|_| HandlerError::server(format!("{user} has a corrupt point balance")))?;

        if starting < points {
            return Err(HandlerError::user(match starting {
                0 => "You don't have any points!".to_string(),
                1 => "You only have 1 point.".to_string(),
                n => format!("You only have {n} points."),
            }));
        }

        let won = (self.coin)();
        let now = if won {
            starting.checked_add(points)
        } else {
            starting.checked_sub(points)
        }
        .ok_or_else(|| HandlerError::user("That's more points than I can count."))?;
        self.data.set(user, now.to_string())?;
        debug!(user, points, won, balance = now, "Roulette spin");

        Ok(Some(if won {
            format!("{} won {points} points and now has {now} points!", message.user)
        } else {
            format!("{} lost {points} points and now has {now} points.", message.user)
        }))
    }
}

impl Default for Roulette {
    fn default() -> Self {
        Self::new()
    }
}

impl Commands for Roulette {
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
        commands.command("roulette", &["points"], Self::roulette)?;
        Ok(())
    }
}
