pub mod core;
pub mod registry;

pub use crate::core::error_signup::SignupError;
pub use crate::core::event::{InvocationContext, SignupEvent};

use crate::core::event::ErrorDetail;
use crate::core::initialization;

/// Handles one pre-signup event with the process-wide dispatcher.
///
/// Always hands the event back. If `init` has not run, the event carries a
/// `NotInitialized` failure instead.
pub async fn dispatch(event: SignupEvent, context: InvocationContext) -> SignupEvent {
    match initialization::dispatcher() {
        Ok(dispatcher) => dispatcher.dispatch(event, context).await,
        Err(err) => {
            #[cfg(feature = "logging")]
            log::error!("SignupHook. {}", err);

            let mut event = event;
            event.attach_failure(ErrorDetail::from(&err));
            event
        }
    }
}

/// Loads settings from the environment and builds the process-wide dispatcher.
pub async fn init() -> Result<(), SignupError> {
    initialization::init().await
}
