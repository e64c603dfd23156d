use crate::core::error_signup::SignupError;
use crate::core::event::{InvocationContext, SignupEvent};
use crate::core::replication::MutationRequest;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// A named unit that reacts to a signup event. Loaded once per process and shared
/// by every invocation, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait ISignupHandler: Send + Sync + 'static {
    async fn handle_async(
        &self,
        event: Arc<SignupEvent>,
        context: Arc<InvocationContext>,
    ) -> Result<(), BoxError>;
}

/// Sends a serialized mutation to the GraphQL endpoint and hands back the raw body.
///
/// Status codes are not interpreted here: GraphQL servers report failures in the
/// body, which the caller parses.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        request: &MutationRequest,
    ) -> Result<Vec<u8>, SignupError>;
}
