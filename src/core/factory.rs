use crate::core::contracts::{BoxError, ISignupHandler};
use async_trait::async_trait;

/// Lets `#[SignupHandler(name = "...", factory)]` build a handler that needs setup
/// (clients, secrets) instead of `Default::default()`.
#[async_trait]
pub trait SignupHandlerProvidesFactory<THandler>
where
    THandler: ISignupHandler,
{
    async fn factory() -> Result<THandler, BoxError>;
}
