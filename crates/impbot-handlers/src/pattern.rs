//! Replies triggered by patterns anywhere in a message.

use impbot_core::{HandlerError, HandlerResult, Message};
use impbot_data::{DataError, Namespace};
use impbot_framework::Handler;
use regex::Regex;
use tracing::info;

const PATTERN_SUFFIX: &str = " pattern";
const NEXT_ID: &str = "next_id";

/// Answers the first pattern that matches a message.
#[derive(Debug, Default)]
pub struct RegexHandler {
    patterns: Vec<(Regex, String)>,
    /// Set by `check` for the following `run`.
    action: Option<String>,
}

impl RegexHandler {
    /// Patterns are tried in the given order.
    pub fn new<'a>(
        patterns: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, HandlerError> {
        let mut handler = Self::default();
        for (pattern, response) in patterns {
            handler.push(pattern, response)?;
        }
        Ok(handler)
    }

    fn push(&mut self, pattern: &str, response: &str) -> Result<(), HandlerError> {
        let regex = Regex::new(pattern).map_err(|e| HandlerError::admin(e.to_string()))?;
        self.patterns.push((regex, response.to_string()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Handler for RegexHandler {
    type Event = Message;

    fn check(&mut self, message: &Message) -> bool {
        self.action = self
            .patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(&message.text))
            .map(|(_, response)| response.clone());
        self.action.is_some()
    }

    fn run(&mut self, _message: &Message) -> HandlerResult {
        Ok(self.action.take())
    }
}

/// A [`RegexHandler`] whose patterns live in the store.
///
/// Patterns are read once, at startup.
pub struct CustomRegex {
    data: Namespace,
    inner: RegexHandler,
}

impl Default for CustomRegex {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomRegex {
    pub fn new() -> Self {
        Self {
            data: Namespace::of::<CustomRegex>(),
            inner: RegexHandler::default(),
        }
    }

    /// Stores a pattern. It takes effect at the next startup.
    pub fn add_pattern(&self, pattern: &str, response: &str) -> Result<(), DataError> {
        let id: u64 = self.data.get_or(NEXT_ID, "0")?.parse().unwrap_or(0);
        self.data.set(NEXT_ID, (id + 1).to_string())?;
        self.data.set(&format!("{id}{PATTERN_SUFFIX}"), pattern)?;
        self.data.set(&format!("{id} response"), response)?;
        Ok(())
    }
}

impl Handler for CustomRegex {
    type Event = Message;

    fn startup(&mut self) -> Result<(), HandlerError> {
        let mut stored: Vec<(u64, String, String)> = Vec::new();
        for (key, pattern) in self.data.list(PATTERN_SUFFIX)? {
            let id = key.strip_suffix(PATTERN_SUFFIX).unwrap_or(&key);
            let response = self.data.get(&format!("{id} response"))?;
            let order = id
                .parse()
                .map_err(|_| HandlerError::admin(format!("bad pattern key '{key}'")))?;
            stored.push((order, pattern, response));
        }
        stored.sort_by_key(|(order, _, _)| *order);

        self.inner = RegexHandler::new(
            stored
                .iter()
                .map(|(_, pattern, response)| (pattern.as_str(), response.as_str())),
        )?;
        info!(patterns = self.inner.len(), "Loaded custom patterns");
        Ok(())
    }

    fn check(&mut self, message: &Message) -> bool {
        self.inner.check(message)
    }

    fn run(&mut self, message: &Message) -> HandlerResult {
        self.inner.run(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impbot_core::{ErrorClass, User};
    use impbot_data::testing::TempStore;
    use serial_test::serial;

    fn msg(text: &str) -> Message {
        Message::new(User::new("test", "username"), text)
    }

    fn respond(handler: &mut impl Handler<Event = Message>, text: &str) -> Option<String> {
        let message = msg(text);
        if handler.check(&message) {
            handler.run(&message).unwrap()
        } else {
            None
        }
    }

    #[test]
    fn test_first_match_wins() {
        let mut handler = RegexHandler::new([("hi+", "Hi!"), ("hello+", "Hello!")]).unwrap();
        assert_eq!(respond(&mut handler, "howdy"), None);
        assert_eq!(respond(&mut handler, "hiiii").as_deref(), Some("Hi!"));
        assert_eq!(respond(&mut handler, "hellooooo").as_deref(), Some("Hello!"));
        assert_eq!(respond(&mut handler, "hi hello").as_deref(), Some("Hi!"));
    }

    #[test]
    fn test_bad_pattern_is_admin_error() {
        let err = RegexHandler::new([("(unclosed", "x")]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Operational);
    }

    #[test]
    #[serial]
    fn test_custom_patterns_load_at_startup() {
        let _store = TempStore::new().unwrap();
        let mut handler = CustomRegex::new();
        for i in 0..10 {
            handler.add_pattern(&format!("^filler{i}$"), "filler").unwrap();
        }
        handler.add_pattern("hi+", "Hi!").unwrap();
        handler.add_pattern("hello+", "Hello!").unwrap();
        assert_eq!(respond(&mut handler, "hiiii"), None);

        handler.startup().unwrap();
        assert_eq!(respond(&mut handler, "howdy"), None);
        assert_eq!(respond(&mut handler, "hiiii").as_deref(), Some("Hi!"));
        assert_eq!(respond(&mut handler, "hellooooo").as_deref(), Some("Hello!"));
        assert_eq!(respond(&mut handler, "hi hello").as_deref(), Some("Hi!"));
    }

    #[test]
    #[serial]
    fn test_stored_bad_pattern_fails_startup() {
        let _store = TempStore::new().unwrap();
        let mut handler = CustomRegex::new();
        handler.add_pattern("[", "broken").unwrap();
        assert!(handler.startup().is_err());
    }
}
