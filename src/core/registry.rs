use crate::core::contracts::{BoxError, ISignupHandler};
use crate::core::error_signup::SignupError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use std::pin::Pin;
use std::sync::Arc;

type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn ISignupHandler>, BoxError>> + Send>>;

pub(crate) type HandlerFactory = dyn Fn() -> HandlerFuture + Send + Sync;

#[derive(Clone)]
pub(crate) struct RegisteredHandler {
    pub type_name: &'static str,
    pub factory: Arc<HandlerFactory>,
}

/// Maps module names to the factories that build their handlers.
///
/// A name claimed twice keeps its first factory, but the clash is remembered so
/// that loading the name fails instead of silently running the first handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, RegisteredHandler>,
    rejected: DashMap<String, Vec<&'static str>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H, F, Fut>(&self, name: impl Into<String>, factory: F) -> Result<(), SignupError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<H, BoxError>> + Send + 'static,
        H: ISignupHandler,
    {
        let name = name.into();
        let type_name = std::any::type_name::<H>();

        let erased: Arc<HandlerFactory> = Arc::new(move || {
            let fut = factory();
            Box::pin(async move {
                let handler = fut.await?;
                Ok::<_, BoxError>(Arc::new(handler) as Arc<dyn ISignupHandler>)
            }) as HandlerFuture
        });

        match self.handlers.entry(name) {
            Entry::Occupied(entry) => {
                self.rejected
                    .entry(entry.key().clone())
                    .or_default()
                    .push(type_name);
                Err(SignupError::HandlerAlreadyRegistered(
                    entry.key().clone(),
                    entry.get().type_name.to_string(),
                ))
            }
            Entry::Vacant(entry) => {
                #[cfg(feature = "logging")]
                log::debug!(
                    "SignupHook. Registered handler '{}' for module '{}'",
                    type_name,
                    entry.key()
                );
                entry.insert(RegisteredHandler {
                    type_name,
                    factory: erased,
                });
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn get(&self, name: &str) -> Option<RegisteredHandler> {
        self.handlers.get(name).map(|entry| entry.value().clone())
    }

    /// Every handler type that claimed `name`, kept one first, when more than one did.
    pub fn conflicting(&self, name: &str) -> Option<Vec<&'static str>> {
        let rejected = self.rejected.get(name)?;
        let mut types = Vec::with_capacity(rejected.len() + 1);
        if let Some(kept) = self.handlers.get(name) {
            types.push(kept.type_name);
        }
        types.extend(rejected.iter().copied());
        Some(types)
    }
}

static GLOBAL_REGISTRY: OnceCell<HandlerRegistry> = OnceCell::new();

/// The process-wide registry that `#[SignupHandler]` registers into.
pub fn global() -> &'static HandlerRegistry {
    GLOBAL_REGISTRY.get_or_init(HandlerRegistry::new)
}

/// Registers a handler factory in the process-wide registry.
pub fn handler<H, F, Fut>(name: &'static str, factory: F) -> Result<(), SignupError>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<H, BoxError>> + Send + 'static,
    H: ISignupHandler,
{
    let result = global().register(name, factory);

    if let Err(ref _err) = result {
        #[cfg(feature = "logging")]
        log::error!("SignupHook. {}", _err);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{InvocationContext, SignupEvent};
    use async_trait::async_trait;

    #[derive(Default)]
    struct DummyHandler;

    #[async_trait]
    impl ISignupHandler for DummyHandler {
        async fn handle_async(
            &self,
            _event: Arc<SignupEvent>,
            _context: Arc<InvocationContext>,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_and_build() {
        let registry = HandlerRegistry::new();
        registry
            .register("dummy", || async { Ok::<_, BoxError>(DummyHandler) })
            .unwrap();

        assert!(registry.contains("dummy"));
        let registered = registry.get("dummy").unwrap();
        assert_eq!(registered.type_name, std::any::type_name::<DummyHandler>());

        let handler = (registered.factory)().await.unwrap();
        handler
            .handle_async(
                Arc::new(SignupEvent::default()),
                Arc::new(InvocationContext::default()),
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = HandlerRegistry::new();
        registry
            .register("dummy", || async { Ok::<_, BoxError>(DummyHandler) })
            .unwrap();

        let result = registry.register("dummy", || async { Ok::<_, BoxError>(DummyHandler) });
        assert!(matches!(
            result,
            Err(SignupError::HandlerAlreadyRegistered(ref name, _)) if name == "dummy"
        ));
    }

    #[test]
    fn test_duplicate_registration_is_remembered() {
        struct OtherHandler;

        #[async_trait]
        impl ISignupHandler for OtherHandler {
            async fn handle_async(
                &self,
                _event: Arc<SignupEvent>,
                _context: Arc<InvocationContext>,
            ) -> Result<(), BoxError> {
                Ok(())
            }
        }

        let registry = HandlerRegistry::new();
        registry
            .register("dummy", || async { Ok::<_, BoxError>(DummyHandler) })
            .unwrap();
        registry
            .register("other", || async { Ok::<_, BoxError>(DummyHandler) })
            .unwrap();
        assert!(registry.conflicting("dummy").is_none());

        let _ = registry.register("dummy", || async { Ok::<_, BoxError>(OtherHandler) });

        assert_eq!(
            registry.conflicting("dummy"),
            Some(vec![
                std::any::type_name::<DummyHandler>(),
                std::any::type_name::<OtherHandler>(),
            ])
        );
        assert!(registry.conflicting("other").is_none());
        assert_eq!(
            registry.get("dummy").unwrap().type_name,
            std::any::type_name::<DummyHandler>()
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = HandlerRegistry::new();
        for name in ["welcome", "audit", "crm"] {
            registry
                .register(name, || async { Ok::<_, BoxError>(DummyHandler) })
                .unwrap();
        }

        assert_eq!(registry.names(), vec!["audit", "crm", "welcome"]);
        assert!(!registry.contains("missing"));
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_factory_error_is_propagated() {
        let registry = HandlerRegistry::new();
        registry
            .register("broken", || async {
                Err::<DummyHandler, BoxError>("no credentials".into())
            })
            .unwrap();

        let registered = registry.get("broken").unwrap();
        let err = match (registered.factory)().await {
            Ok(_) => panic!("factory should fail"),
            Err(err) => err,
        };
        assert_eq!(err.to_string(), "no credentials");
    }
}
