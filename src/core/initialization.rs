use crate::core::contracts::GraphqlTransport;
use crate::core::dispatcher::SignupDispatcher;
use crate::core::error_signup::SignupError;
use crate::core::loader::{ModuleList, ModuleSet, load};
use crate::core::registry::{self, HandlerRegistry};
use crate::core::replication::ReqwestTransport;
use crate::core::settings::{DispatchMode, HookSettings};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static DISPATCHER: OnceCell<SignupDispatcher> = OnceCell::new();

/// Reads the environment, loads the modules from the global registry and installs
/// the process-wide dispatcher. Any error here means the hook must not serve events.
pub async fn init() -> Result<(), SignupError> {
    let settings = HookSettings::from_env()?;
    init_with(settings, registry::global(), Arc::new(ReqwestTransport::new())).await
}

pub async fn init_with(
    settings: HookSettings,
    registry: &HandlerRegistry,
    transport: Arc<dyn GraphqlTransport>,
) -> Result<(), SignupError> {
    if DISPATCHER.get().is_some() {
        return Err(SignupError::AlreadyInitialized("SignupDispatcher".into()));
    }

    let dispatcher = build(settings, registry, transport).await?;
    DISPATCHER
        .set(dispatcher)
        .map_err(|_| SignupError::AlreadyInitialized("SignupDispatcher".into()))?;

    #[cfg(feature = "logging")]
    log::info!("SignupHook. Dispatcher initialized");

    Ok(())
}

/// Builds a dispatcher without installing it.
///
/// Fan-out mode requires `MODULES`. In replicate mode the list is optional, but
/// when given it must still resolve.
pub async fn build(
    settings: HookSettings,
    registry: &HandlerRegistry,
    transport: Arc<dyn GraphqlTransport>,
) -> Result<SignupDispatcher, SignupError> {
    let modules = match (settings.mode, settings.modules.as_deref()) {
        (DispatchMode::Replicate, None) => ModuleSet::default(),
        (_, raw) => load(&ModuleList::parse(raw)?, registry).await?,
    };

    #[cfg(feature = "logging")]
    log::info!(
        "SignupHook. Mode {:?} with modules {:?}",
        settings.mode,
        modules.names()
    );

    Ok(SignupDispatcher::new(settings, modules, transport))
}

pub fn dispatcher() -> Result<&'static SignupDispatcher, SignupError> {
    DISPATCHER
        .get()
        .ok_or_else(|| SignupError::NotInitialized("SignupDispatcher".into()))
}
