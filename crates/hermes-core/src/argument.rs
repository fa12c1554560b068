//! The [`Argument`] trait implemented by every service method argument.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::ValidationErrors;

/// A value that can be bound from request data and handed to a service
/// method.
///
/// Records opt in with an empty impl, or with [`validated_argument!`] when
/// they derive [`validator::Validate`]. Structural validation only runs for
/// record-shaped arguments.
///
/// ```rust
/// use hermes_core::Argument;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Search {
///     query: String,
///     limit: Option<u32>,
/// }
///
/// impl Argument for Search {}
/// ```
///
/// [`validated_argument!`]: crate::validated_argument
pub trait Argument: DeserializeOwned + Serialize + Send + 'static {
    /// Runs structural validation on the merged argument.
    fn validate_argument(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl<V> Argument for HashMap<String, V> where V: DeserializeOwned + Serialize + Send + 'static {}

impl<V> Argument for BTreeMap<String, V> where V: DeserializeOwned + Serialize + Send + 'static {}

impl Argument for serde_json::Map<String, serde_json::Value> {}

impl<T> Argument for Vec<T> where T: DeserializeOwned + Serialize + Send + 'static {}

/// Implements [`Argument`] for record types deriving [`validator::Validate`].
///
/// ```rust
/// use hermes_core::{validated_argument, Argument};
/// use serde::{Deserialize, Serialize};
/// use validator::Validate;
///
/// #[derive(Serialize, Deserialize, Validate)]
/// struct Transfer {
///     #[validate(range(min = 1))]
///     amount: u64,
/// }
///
/// validated_argument!(Transfer);
///
/// assert!(Transfer { amount: 0 }.validate_argument().is_err());
/// assert!(Transfer { amount: 5 }.validate_argument().is_ok());
/// ```
#[macro_export]
macro_rules! validated_argument {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Argument for $ty {
                fn validate_argument(
                    &self,
                ) -> ::core::result::Result<(), $crate::__private::validator::ValidationErrors> {
                    $crate::__private::validator::Validate::validate(self)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Serialize, Deserialize, Validate)]
    struct Signup {
        #[validate(length(min = 3))]
        name: String,
    }

    validated_argument!(Signup);

    #[test]
    fn test_default_validation_passes() {
        let map: HashMap<String, i32> = HashMap::new();
        assert!(map.validate_argument().is_ok());
        assert!(Vec::<String>::new().validate_argument().is_ok());
    }

    #[test]
    fn test_validated_argument_macro() {
        let bad = Signup {
            name: "al".to_string(),
        };
        let errors = bad.validate_argument().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let good = Signup {
            name: "alice".to_string(),
        };
        assert!(good.validate_argument().is_ok());
    }
}
