//! Whitespace splitting for command lines.

/// Splits a line into the command token and the argument string.
///
/// Leading whitespace is dropped from both; the argument string keeps any
/// trailing whitespace. Returns `None` for a blank line.
pub fn split_command(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(end) => Some((&text[..end], text[end..].trim_start())),
        None => Some((text, "")),
    }
}

/// Splits an argument string into at most `count` tokens.
///
/// The last token keeps whatever whitespace it contains, so a final text
/// parameter can swallow the rest of the line. Fewer tokens are returned when
/// the string runs out.
pub fn split_args(argstring: &str, count: usize) -> Vec<&str> {
    let mut parts = Vec::with_capacity(count);
    if count == 0 {
        return parts;
    }

    let mut rest = argstring.trim_start();
    while !rest.is_empty() {
        if parts.len() + 1 == count {
            parts.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("!x"), Some(("!x", "")));
        assert_eq!(split_command("  !x   a b "), Some(("!x", "a b ")));
        assert_eq!(split_command("   "), None);
    }

    #[test]
    fn test_split_args_limits_token_count() {
        assert_eq!(split_args("6 42 foo bar", 3), ["6", "42", "foo bar"]);
        assert_eq!(split_args("6 foo bar 42", 3), ["6", "foo", "bar 42"]);
        assert_eq!(split_args("a b  c ", 2), ["a", "b  c "]);
    }

    #[test]
    fn test_split_args_runs_out() {
        assert_eq!(split_args("6 42 ", 3), ["6", "42"]);
        assert_eq!(split_args("6  42", 3), ["6", "42"]);
        assert!(split_args("", 1).is_empty());
        assert!(split_args("ignored text", 0).is_empty());
    }
}
