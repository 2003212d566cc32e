// src/core/params.rs

use std::any::Any;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Failure to convert one textual argument into its target type.
///
/// Every parser in this module (and any user-supplied one) reports the same
/// shape: the offending value, the target type's name, and the underlying
/// conversion failure when one exists.
#[derive(Error, Debug)]
#[error("could not parse argument value '{value}' while converting to type {type_name}")]
pub struct ParseError {
    value: String,
    type_name: &'static str,
    #[source]
    source: Option<anyhow::Error>,
}

impl ParseError {
    /// A parse failure with an underlying cause.
    pub fn new<E>(value: &str, type_name: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            value: value.to_string(),
            type_name,
            source: Some(anyhow::Error::new(source)),
        }
    }

    /// A parse failure with no distinct underlying cause.
    pub fn bare(value: &str, type_name: &'static str) -> Self {
        Self {
            value: value.to_string(),
            type_name,
            source: None,
        }
    }

    /// The value that could not be converted.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The target type's display name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A parser converting one textual argument into a value of one target
/// type.
///
/// Parsers are stateless and independent of each other; new target types
/// plug in by implementing this trait, without touching the resolver. Most
/// implementations delegate to [`parse_from_str`].
pub trait ParamValue: Any + Send + Sized {
    /// The name reported in parse failures and missing-argument
    /// diagnostics.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Converts the raw token.
    fn parse(raw: &str) -> Result<Self, ParseError>;
}

/// The generic textual-to-typed fallback: adapts any [`FromStr`] type and
/// reports its failure in the common [`ParseError`] shape.
pub fn parse_from_str<T>(raw: &str) -> Result<T, ParseError>
where
    T: ParamValue + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|error| ParseError::new(raw, T::type_name(), error))
}

impl ParamValue for String {
    fn type_name() -> &'static str {
        "String"
    }

    // Text to text: cannot fail.
    fn parse(raw: &str) -> Result<Self, ParseError> {
        Ok(raw.to_string())
    }
}

macro_rules! from_str_param_value {
    ($( $ty:ty => $name:literal ),+ $(,)?) => {
        $(
            impl ParamValue for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                fn parse(raw: &str) -> Result<Self, ParseError> {
                    parse_from_str(raw)
                }
            }
        )+
    };
}

from_str_param_value!(
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    bool => "bool",
    char => "char",
    PathBuf => "PathBuf",
);

#[cfg(test)]
mod tests {
    use super::*;

    // --- Primitive Parser Tests ---

    #[test]
    fn test_integer_parse_ok() {
        assert_eq!(i64::parse("42").unwrap(), 42);
        assert_eq!(u32::parse("0").unwrap(), 0);
    }

    #[test]
    fn test_integer_parse_failure_names_value_and_type() {
        let error = i64::parse("thirty").unwrap_err();
        assert_eq!(error.value(), "thirty");
        assert_eq!(error.type_name(), "i64");
        assert!(error.to_string().contains("'thirty'"));
        assert!(error.to_string().contains("i64"));
    }

    #[test]
    fn test_parse_failure_carries_original_cause() {
        let error = u32::parse("-1").unwrap_err();
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_bool_parse() {
        assert!(bool::parse("true").unwrap());
        assert!(!bool::parse("false").unwrap());
        assert!(bool::parse("yes").is_err());
    }

    #[test]
    fn test_string_parse_is_infallible() {
        assert_eq!(String::parse("anything at all").unwrap(), "anything at all");
    }

    #[test]
    fn test_path_parse() {
        assert_eq!(
            PathBuf::parse("/tmp/data").unwrap(),
            PathBuf::from("/tmp/data")
        );
    }

    // --- Extension Point Tests ---

    #[derive(Debug, PartialEq)]
    struct Percentage(u8);

    impl ParamValue for Percentage {
        fn type_name() -> &'static str {
            "Percentage"
        }

        fn parse(raw: &str) -> Result<Self, ParseError> {
            let digits = raw
                .strip_suffix('%')
                .ok_or_else(|| ParseError::bare(raw, Self::type_name()))?;
            let value = digits
                .parse::<u8>()
                .map_err(|error| ParseError::new(raw, Self::type_name(), error))?;
            Ok(Self(value))
        }
    }

    #[test]
    fn test_user_defined_parser_uses_common_error_shape() {
        assert_eq!(Percentage::parse("75%").unwrap(), Percentage(75));
        let error = Percentage::parse("75").unwrap_err();
        assert_eq!(error.value(), "75");
        assert_eq!(error.type_name(), "Percentage");
    }
}
