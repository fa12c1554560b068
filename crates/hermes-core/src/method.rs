//! Type-erased service method bound to its verified contract.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::argument::Argument;
use crate::context::CallContext;
use crate::contract::{ArgContract, ArgShape};
use crate::error::ContractViolation;
use crate::returns::IntoMethodReturn;
use crate::BoxFuture;

type MethodFn<A, R> = dyn Fn(CallContext, A) -> BoxFuture<'static, R> + Send + Sync;

/// A service method together with the verified shape of its argument.
///
/// Construction is the only place the contract is checked; a
/// `MethodContract` that exists is always callable with a well-shaped
/// argument.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use hermes_core::{CallContext, MethodContract, ArgShape};
///
/// let contract = MethodContract::check(
///     |_ctx: CallContext, args: HashMap<String, String>| async move { args.len() as u64 },
/// )
/// .unwrap();
///
/// assert_eq!(contract.shape(), &ArgShape::Map);
/// ```
pub struct MethodContract<A, R> {
    method: Arc<MethodFn<A, R>>,
    argument: ArgContract,
}

impl<A, R> MethodContract<A, R>
where
    A: Argument,
    R: IntoMethodReturn,
{
    /// Verifies the argument shape of `method` and binds it.
    pub fn check<F, Fut>(method: F) -> Result<Self, ContractViolation>
    where
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let argument = ArgContract::inspect::<A>()?;
        tracing::debug!(
            argument = argument.type_name(),
            shape = %argument.shape(),
            "service method contract verified"
        );

        Ok(Self {
            method: Arc::new(move |ctx, arg| Box::pin(method(ctx, arg))),
            argument,
        })
    }

    /// Calls the method. A panic may escape from this call as well as from
    /// polling the returned future.
    pub fn call(&self, ctx: CallContext, argument: A) -> BoxFuture<'static, R> {
        (self.method)(ctx, argument)
    }

    /// The verified argument contract.
    #[must_use]
    pub fn argument(&self) -> &ArgContract {
        &self.argument
    }

    /// Shorthand for `self.argument().shape()`.
    #[must_use]
    pub fn shape(&self) -> &ArgShape {
        self.argument.shape()
    }
}

impl<A, R> Clone for MethodContract<A, R> {
    fn clone(&self) -> Self {
        Self {
            method: Arc::clone(&self.method),
            argument: self.argument,
        }
    }
}

impl<A, R> fmt::Debug for MethodContract<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodContract")
            .field("argument", &self.argument)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::FormattedResponse;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Greeting {
        name: String,
    }

    impl Argument for Greeting {}

    #[derive(Serialize, Deserialize)]
    struct Level(u8);

    impl Argument for Level {}

    #[tokio::test]
    async fn test_check_and_call_record() {
        let contract = MethodContract::check(|_ctx: CallContext, g: Greeting| async move {
            FormattedResponse::ok(serde_json::json!(format!("hello {}", g.name)))
        })
        .unwrap();

        assert_eq!(contract.shape().fields(), &["name"]);

        let out = contract
            .call(
                CallContext::builder().build(),
                Greeting {
                    name: "ada".to_string(),
                },
            )
            .await;
        assert_eq!(out.data, serde_json::json!("hello ada"));
    }

    #[test]
    fn test_check_rejects_scalar_newtype() {
        let err = MethodContract::check(|_ctx: CallContext, _l: Level| async {}).unwrap_err();
        assert!(matches!(err, ContractViolation::UnsupportedArgument { .. }));
    }

    #[test]
    fn test_clone_shares_method() {
        let contract =
            MethodContract::check(|_ctx: CallContext, v: Vec<i32>| async move { v.len() as u64 })
                .unwrap();
        let copy = contract.clone();
        assert_eq!(copy.shape(), &ArgShape::Sequence);
        assert!(format!("{copy:?}").contains("MethodContract"));
    }
}
