//! Moderator-defined commands.
//!
//! `!addcom !name text` stores a response under `name`. Anyone can then say
//! `!name` (in any case) to get it back, with `(count)` replaced by how many
//! times the command has been used. Aliases point at another command and are
//! followed on lookup.

use std::collections::{BTreeMap, HashSet};

use impbot_core::{HandlerError, HandlerResult, Message};
use impbot_data::{DataResult, Namespace};
use impbot_framework::{COMMAND_MARKER, CommandHandler, CommandRegistry, CommandResult, Commands};
use tracing::{info, warn};

const RESPONSE: &str = "response";
const COUNT: &str = "count";
const ALIAS: &str = "alias";

/// Names that would shadow the management commands.
const BUILTINS: [&str; 5] = ["addcom", "editcom", "delcom", "aliascom", "resetcount"];

type Entry = BTreeMap<String, String>;

/// Strips the marker and folds case.
pub fn normalize(command: &str) -> String {
    command
        .strip_prefix(COMMAND_MARKER)
        .unwrap_or(command)
        .to_lowercase()
}

/// Formats with comma thousands separators.
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Custom command storage and the commands that manage it.
pub struct CustomCommands {
    data: Namespace,
    /// Set by `check_other` for the following `run_other`.
    lookup: Option<(String, Entry)>,
}

/// [`CustomCommands`] ready to register.
pub type CustomCommandHandler = CommandHandler<CustomCommands>;

impl Default for CustomCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomCommands {
    pub fn new() -> Self {
        Self {
            data: Namespace::of::<CustomCommands>(),
            lookup: None,
        }
    }

    pub fn handler(self) -> CommandResult<CustomCommandHandler> {
        CommandHandler::new(self)
    }

    /// Resolves `name` to a real command, following aliases.
    ///
    /// Returns `None` for missing commands, dangling aliases and alias loops.
    fn lookup(&self, name: &str) -> DataResult<Option<(String, Entry)>> {
        let mut name = name.to_string();
        let mut visited = HashSet::new();
        loop {
            visited.insert(name.clone());
            let entry = match self.data.get_dict(&name) {
                Ok(entry) => entry,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };
            match entry.get(ALIAS) {
                Some(target) if visited.contains(target) => {
                    warn!(command = %name, target = %target, "Alias loop");
                    return Ok(None);
                }
                Some(target) => name = target.clone(),
                None => return Ok(Some((name, entry))),
            }
        }
    }

    fn check_new_name(&self, name: &str) -> Result<(), HandlerError> {
        if self.data.exists(name)? {
            return Err(HandlerError::user(format!("!{name} already exists.")));
        }
        if BUILTINS.contains(&name) {
            return Err(HandlerError::user(format!("Can't use !{name} for a command.")));
        }
        Ok(())
    }

    fn addcom(&mut self, message: &Message, name: String, text: String) -> HandlerResult {
        let name = normalize(&name);
        self.check_new_name(&name)?;
        self.data.set(
            &name,
            Entry::from([(RESPONSE.into(), text), (COUNT.into(), "0".into())]),
        )?;
        info!(command = %name, user = %message.user, "Custom command added");
        Ok(Some(format!("Added !{name}.")))
    }

    fn editcom(&mut self, message: &Message, name: String, text: String) -> HandlerResult {
        let name = normalize(&name);
        match self.lookup(&name)? {
            Some((target, _)) => {
                self.data.set_subkey(&target, RESPONSE, &text)?;
                info!(command = %target, user = %message.user, "Custom command edited");
                if target == name {
                    Ok(Some(format!("Edited !{name}.")))
                } else {
                    Ok(Some(format!("Edited !{name} (alias to !{target}).")))
                }
            }
            None => {
                self.data.set(
                    &name,
                    Entry::from([(RESPONSE.into(), text), (COUNT.into(), "0".into())]),
                )?;
                info!(command = %name, user = %message.user, "Custom command added");
                Ok(Some(format!("!{name} didn't exist; added it.")))
            }
        }
    }

    fn delcom(&mut self, message: &Message, name: String) -> HandlerResult {
        let name = normalize(&name);
        let entry = match self.data.get_dict(&name) {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                return Err(HandlerError::user(format!("!{name} doesn't exist.")));
            }
            Err(e) => return Err(e.into()),
        };
        self.data.unset(&name)?;
        info!(command = %name, user = %message.user, "Custom command deleted");
        Ok(Some(match entry.get(ALIAS) {
            Some(target) => format!("Deleted !{name}. (It was an alias to !{target}.)"),
            None => format!("Deleted !{name}."),
        }))
    }

    fn aliascom(&mut self, message: &Message, name: String, target: String) -> HandlerResult {
        let name = normalize(&name);
        let target = normalize(&target);
        self.check_new_name(&name)?;
        let Some((target, _)) = self.lookup(&target)? else {
            return Err(HandlerError::user(format!(
                "!{target} isn't a custom command."
            )));
        };
        self.data
            .set(&name, Entry::from([(ALIAS.into(), target.clone())]))?;
        info!(command = %name, target = %target, user = %message.user, "Alias added");
        Ok(Some(format!("Added !{name} as an alias to !{target}.")))
    }

    fn resetcount(&mut self, _message: &Message, name: String, count: Option<i64>) -> HandlerResult {
        let count = count.unwrap_or(0);
        let name = normalize(&name);
        let Some((name, _)) = self.lookup(&name)? else {
            return Err(HandlerError::user(format!("!{name} doesn't exist")));
        };
        self.data.set_subkey(&name, COUNT, &count.to_string())?;
        Ok(Some(format!("Reset !{name} counter to {count}.")))
    }
}

impl Commands for CustomCommands {
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
        commands.command("addcom", &["name", "text"], Self::addcom)?;
        commands.command("editcom", &["name", "text"], Self::editcom)?;
        commands.command("delcom", &["name"], Self::delcom)?;
        commands.command("aliascom", &["name", "target"], Self::aliascom)?;
        commands.command("resetcount", &["name", "count"], Self::resetcount)?;
        Ok(())
    }

    /// Every management command is for moderators.
    fn authorize(&mut self, message: &Message, _command: &str) -> Result<(), HandlerError> {
        if message.user.moderator() {
            Ok(())
        } else {
            Err(HandlerError::user("You can't do that."))
        }
    }

    fn check_other(&mut self, message: &Message) -> bool {
        self.lookup = None;
        let Some(first) = message.text.split_whitespace().next() else {
            return false;
        };
        if !first.starts_with(COMMAND_MARKER) {
            return false;
        }
        match self.lookup(&normalize(first)) {
            Ok(found) => {
                self.lookup = found;
                self.lookup.is_some()
            }
            Err(e) => {
                warn!(command = first, error = %e, "Custom command lookup failed");
                false
            }
        }
    }

    fn run_other(&mut self, _message: &Message) -> HandlerResult {
        let (name, entry) = self
            .lookup
            .take()
            .ok_or_else(|| HandlerError::invariant("custom command run without a lookup"))?;
        let response = entry
            .get(RESPONSE)
            .ok_or_else(|| HandlerError::server(format!("!{name} has no response")))?;
        let count = entry
            .get(COUNT)
            .map_or(Ok(0), |c| c.parse::<i64>())
            .map_err(|_| HandlerError::server(format!("!{name} has a corrupt count")))?
            .checked_add(1)
            .ok_or_else(|| HandlerError::user(format!("!{name} can't count any higher.")))?;
        self.data.set_subkey(&name, COUNT, &count.to_string())?;
        Ok(Some(response.replace("(count)", &group_thousands(count))))
    }
}
