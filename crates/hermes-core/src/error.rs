//! Registration-time errors.

use thiserror::Error;

/// A candidate service method does not satisfy the calling contract.
///
/// Only the argument shape is checked at runtime; the arity, the context
/// parameter and the single return value are already guaranteed by the
/// signature accepted at registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The argument is neither a record, a string-keyed map nor a sequence.
    #[error(
        "argument type `{type_name}` must be a record, a string-keyed map or a sequence, found {found}"
    )]
    UnsupportedArgument {
        /// Rust type name of the argument.
        type_name: &'static str,
        /// Shape that was found instead.
        found: &'static str,
    },

    /// The argument is a map whose keys do not decode from strings.
    #[error("argument type `{type_name}` is a map keyed by {key}, keys must be strings")]
    NonStringKeys {
        /// Rust type name of the argument.
        type_name: &'static str,
        /// Shape of the key type.
        key: &'static str,
    },

    /// The argument's `Deserialize` implementation did not reveal a shape.
    #[error("argument type `{type_name}` could not be inspected: {reason}")]
    Uninspectable {
        /// Rust type name of the argument.
        type_name: &'static str,
        /// What went wrong while probing.
        reason: String,
    },
}

impl ContractViolation {
    /// Rust type name of the offending argument.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UnsupportedArgument { type_name, .. }
            | Self::NonStringKeys { type_name, .. }
            | Self::Uninspectable { type_name, .. } => type_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_type_and_shape() {
        let err = ContractViolation::UnsupportedArgument {
            type_name: "u32",
            found: "an unsigned integer",
        };
        let text = err.to_string();
        assert!(text.contains("`u32`"));
        assert!(text.contains("an unsigned integer"));
        assert_eq!(err.type_name(), "u32");
    }
}
