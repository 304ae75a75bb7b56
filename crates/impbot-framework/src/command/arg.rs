//! Typed command arguments.
//!
//! Every parameter of a command function implements [`CommandArg`], which
//! says how to turn one whitespace-delimited token into a value.

use std::fmt;

use thiserror::Error;

/// The declared kind of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// Free text.
    Text,
    /// A whole number.
    Integer,
    /// A floating-point number.
    Float,
    /// `true` or `false`.
    Boolean,
    /// May be left out; absent values are `None`.
    Optional(Box<ArgKind>),
    /// The first alternative that parses wins.
    Either(Box<ArgKind>, Box<ArgKind>),
}

impl ArgKind {
    /// Whether the argument may be left out.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::Either(left, right) => write!(f, "{left} or {right}"),
        }
    }
}

/// Why a token could not become an argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// The token does not parse as the declared kind.
    #[error("'{token}' is not a valid {expected}")]
    Invalid {
        /// The offending token.
        token: String,
        /// The declared kind.
        expected: ArgKind,
    },

    /// A required argument was not given.
    #[error("missing argument")]
    Missing,
}

impl ArgError {
    fn invalid(token: &str, expected: ArgKind) -> Self {
        Self::Invalid {
            token: token.to_string(),
            expected,
        }
    }
}

/// A type usable as a command parameter.
pub trait CommandArg: Sized {
    /// The declared kind, used for usage strings.
    fn kind() -> ArgKind;

    /// Converts one token.
    fn parse(token: &str) -> Result<Self, ArgError>;

    /// The value used when the token is missing, if the argument is optional.
    fn absent() -> Option<Self> {
        None
    }
}

impl CommandArg for String {
    fn kind() -> ArgKind {
        ArgKind::Text
    }

    fn parse(token: &str) -> Result<Self, ArgError> {
        Ok(token.to_string())
    }
}

macro_rules! impl_from_str_arg {
    ($kind:ident: $($ty:ty),*) => {
        $(
            impl CommandArg for $ty {
                fn kind() -> ArgKind {
                    ArgKind::$kind
                }

                fn parse(token: &str) -> Result<Self, ArgError> {
                    token
                        .parse()
                        .map_err(|_| ArgError::invalid(token, ArgKind::$kind))
                }
            }
        )*
    };
}

impl_from_str_arg!(Integer: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_from_str_arg!(Float: f32, f64);
impl_from_str_arg!(Boolean: bool);

impl<T: CommandArg> CommandArg for Option<T> {
    fn kind() -> ArgKind {
        ArgKind::Optional(Box::new(T::kind()))
    }

    fn parse(token: &str) -> Result<Self, ArgError> {
        T::parse(token).map(Some)
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

/// A parameter accepting either of two kinds, tried left first.
#[derive(Debug, Clone, PartialEq)]
pub enum Either<L, R> {
    /// The left alternative parsed.
    Left(L),
    /// Only the right alternative parsed.
    Right(R),
}

impl<L: CommandArg, R: CommandArg> CommandArg for Either<L, R> {
    fn kind() -> ArgKind {
        ArgKind::Either(Box::new(L::kind()), Box::new(R::kind()))
    }

    fn parse(token: &str) -> Result<Self, ArgError> {
        L::parse(token)
            .map(Either::Left)
            .or_else(|_| R::parse(token).map(Either::Right))
            .map_err(|_| ArgError::invalid(token, Self::kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(i64::parse("6"), Ok(6));
        assert_eq!(f64::parse("42"), Ok(42.0));
        assert_eq!(bool::parse("true"), Ok(true));
        assert_eq!(String::parse("foo bar"), Ok("foo bar".to_string()));
        assert!(i64::parse("twenty").is_err());
        assert!(bool::parse("yes").is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(<Option<i64>>::parse("3"), Ok(Some(3)));
        assert_eq!(<Option<i64>>::absent(), Some(None));
        assert_eq!(i64::absent(), None);
        // A present but malformed token is still an error.
        assert!(<Option<i64>>::parse("x").is_err());
        assert!(<Option<i64>>::kind().is_optional());
    }

    #[test]
    fn test_either_tries_left_first() {
        type IntOrText = Either<i64, String>;
        assert_eq!(IntOrText::parse("5"), Ok(Either::Left(5)));
        assert_eq!(IntOrText::parse("five"), Ok(Either::Right("five".into())));
        assert!(<Either<i64, bool>>::parse("five").is_err());
    }

    #[test]
    fn test_invalid_message() {
        let err = u32::parse("-1").unwrap_err();
        assert_eq!(err.to_string(), "'-1' is not a valid integer");
    }
}
