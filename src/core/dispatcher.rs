use crate::core::contracts::GraphqlTransport;
use crate::core::event::{ErrorDetail, InvocationContext, SignupEvent};
use crate::core::fan_out;
use crate::core::loader::ModuleSet;
use crate::core::replication::{MutationOutcome, replicate_user};
use crate::core::settings::{DispatchMode, HookSettings};
use std::sync::Arc;

/// Handles one pre-signup event per call. Cheap to share: all state is immutable
/// after construction.
#[derive(Clone)]
pub struct SignupDispatcher {
    settings: Arc<HookSettings>,
    modules: Arc<ModuleSet>,
    transport: Arc<dyn GraphqlTransport>,
}

impl SignupDispatcher {
    pub fn new(
        settings: HookSettings,
        modules: ModuleSet,
        transport: Arc<dyn GraphqlTransport>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            modules: Arc::new(modules),
            transport,
        }
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    /// Returns the event it was given. On failure `response` carries status 400 and
    /// the error; on success `response` is left as the provider sent it.
    pub async fn dispatch(&self, event: SignupEvent, context: InvocationContext) -> SignupEvent {
        match self.settings.mode {
            DispatchMode::Replicate => self.replicate(event).await,
            DispatchMode::FanOut => self.fan_out(event, context).await,
        }
    }

    async fn replicate(&self, mut event: SignupEvent) -> SignupEvent {
        if let MutationOutcome::Failed(err) =
            replicate_user(&self.settings, self.transport.as_ref(), &event).await
        {
            event.attach_failure(ErrorDetail::from(&err));
        }
        event
    }

    async fn fan_out(&self, event: SignupEvent, context: InvocationContext) -> SignupEvent {
        let shared = Arc::new(event);
        let result = fan_out::run_all(
            &self.modules,
            Arc::clone(&shared),
            Arc::new(context),
            self.settings.sibling_policy,
        )
        .await;

        // Detached siblings may still hold the event.
        let mut event = Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone());
        if let Err(err) = result {
            event.attach_failure(ErrorDetail::from(&err));
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::{BoxError, ISignupHandler};
    use crate::core::error_signup::SignupError;
    use crate::core::loader::{ModuleList, load};
    use crate::core::registry::HandlerRegistry;
    use crate::core::replication::{MutationRequest, ReqwestTransport};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_event() -> SignupEvent {
        serde_json::from_value(json!({
            "triggerSource": "PreSignUp_SignUp",
            "userName": "id-1",
            "request": { "userAttributes": { "email": "ada@example.com" } }
        }))
        .unwrap()
    }

    fn replicate_settings(endpoint: Option<String>) -> HookSettings {
        HookSettings {
            graphql_endpoint: endpoint,
            graphql_api_key: Some("da2-test-key".into()),
            ..HookSettings::default()
        }
    }

    fn replicating(endpoint: Option<String>) -> SignupDispatcher {
        SignupDispatcher::new(
            replicate_settings(endpoint),
            ModuleSet::default(),
            Arc::new(ReqwestTransport::new()),
        )
    }

    async fn mock_graphql(body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_success_leaves_event_untouched() {
        let server = mock_graphql(json!({
            "data": { "createUser": { "id": "id-1", "email": "ada@example.com" } }
        }))
        .await;

        let dispatcher = replicating(Some(format!("{}/graphql", server.uri())));
        let event = provider_event();
        let returned = dispatcher
            .dispatch(event.clone(), InvocationContext::default())
            .await;

        assert_eq!(returned, event);
        assert!(serde_json::to_value(&returned).unwrap().get("response").is_none());
    }

    #[tokio::test]
    async fn test_graphql_errors_become_response() {
        let server = mock_graphql(json!({ "errors": [{ "message": "dup" }] })).await;

        let dispatcher = replicating(Some(format!("{}/graphql", server.uri())));
        let returned = dispatcher
            .dispatch(provider_event(), InvocationContext::default())
            .await;

        let value = serde_json::to_value(&returned).unwrap();
        assert_eq!(value["response"]["statusCode"], json!(400));
        let message = value["response"]["body"]["errors"][0]["message"]
            .as_str()
            .unwrap();
        assert!(message.contains(r#"[{"message":"dup"}]"#));
        assert_eq!(value["userName"], json!("id-1"));
        assert_eq!(value["triggerSource"], json!("PreSignUp_SignUp"));
    }

    #[tokio::test]
    async fn test_graphql_error_object_becomes_logical_response() {
        let server = mock_graphql(json!({ "data": null, "errors": { "message": "dup" } })).await;

        let returned = replicating(Some(format!("{}/graphql", server.uri())))
            .dispatch(provider_event(), InvocationContext::default())
            .await;

        let failure = returned.failure().expect("failure must be attached");
        assert_eq!(failure.message, r#"{"message":"dup"}"#);
        assert!(failure.stack.starts_with("SignupError: GraphQL errors"));
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_response() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/graphql", listener.local_addr().unwrap());
        drop(listener);

        let transport_message = match ReqwestTransport::new()
            .post(
                &endpoint,
                "da2-test-key",
                &MutationRequest::create_user(&provider_event()),
            )
            .await
        {
            Err(SignupError::Transport(err)) => err.to_string(),
            other => panic!("expected transport failure, got {other:?}"),
        };

        let returned = replicating(Some(endpoint))
            .dispatch(provider_event(), InvocationContext::default())
            .await;

        let failure = returned.failure().expect("failure must be attached");
        assert_eq!(failure.message, transport_message);
        assert!(failure.stack.starts_with("SignupError: Transport failure"));
        assert_eq!(failure.stack.matches(&transport_message).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_endpoint_becomes_response() {
        let returned = replicating(None)
            .dispatch(provider_event(), InvocationContext::default())
            .await;

        let failure = returned.failure().expect("failure must be attached");
        assert!(failure.message.contains("GRAPHQL_ENDPOINT"));
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let returned = replicating(Some(format!("{}/graphql", server.uri())))
            .dispatch(provider_event(), InvocationContext::default())
            .await;

        assert_eq!(
            returned.response.as_ref().and_then(|r| r.status_code),
            Some(400)
        );
    }

    struct SlowHandler {
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ISignupHandler for SlowHandler {
        async fn handle_async(
            &self,
            _event: Arc<SignupEvent>,
            _context: Arc<InvocationContext>,
        ) -> Result<(), BoxError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RejectingHandler;

    #[async_trait]
    impl ISignupHandler for RejectingHandler {
        async fn handle_async(
            &self,
            _event: Arc<SignupEvent>,
            _context: Arc<InvocationContext>,
        ) -> Result<(), BoxError> {
            Err("welcome email bounced".into())
        }
    }

    struct QuickHandler;

    #[async_trait]
    impl ISignupHandler for QuickHandler {
        async fn handle_async(
            &self,
            event: Arc<SignupEvent>,
            _context: Arc<InvocationContext>,
        ) -> Result<(), BoxError> {
            if event.email().is_none() {
                return Err("email required".into());
            }
            Ok(())
        }
    }

    async fn fan_out_dispatcher(raw: &str, registry: &HandlerRegistry) -> SignupDispatcher {
        let settings = HookSettings {
            modules: Some(raw.to_string()),
            mode: DispatchMode::FanOut,
            ..HookSettings::default()
        };
        let modules = load(&ModuleList::parse(Some(raw)).unwrap(), registry)
            .await
            .unwrap();
        SignupDispatcher::new(settings, modules, Arc::new(ReqwestTransport::new()))
    }

    #[tokio::test]
    async fn test_fan_out_success_returns_event_unchanged() {
        let registry = HandlerRegistry::new();
        registry
            .register("a", || async { Ok::<_, BoxError>(QuickHandler) })
            .unwrap();
        registry
            .register("b", || async { Ok::<_, BoxError>(QuickHandler) })
            .unwrap();

        let dispatcher = fan_out_dispatcher("a,b", &registry).await;
        let event = provider_event();
        let returned = dispatcher
            .dispatch(event.clone(), InvocationContext::default())
            .await;

        assert_eq!(returned, event);
    }

    #[tokio::test]
    async fn test_fan_out_reports_failing_second_handler() {
        let finished = Arc::new(AtomicUsize::new(0));
        let registry = HandlerRegistry::new();
        for name in ["first", "third"] {
            let finished = Arc::clone(&finished);
            registry
                .register(name, move || {
                    let handler = SlowHandler {
                        finished: Arc::clone(&finished),
                    };
                    async move { Ok::<_, BoxError>(handler) }
                })
                .unwrap();
        }
        registry
            .register("second", || async { Ok::<_, BoxError>(RejectingHandler) })
            .unwrap();

        let dispatcher = fan_out_dispatcher("first,second,third", &registry).await;
        let event = provider_event();
        let returned = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch(event.clone(), InvocationContext::default()),
        )
        .await
        .expect("dispatch must not wait for slow siblings");

        let failure = returned.failure().expect("failure must be attached");
        assert!(failure.message.contains("second"));
        assert!(failure.message.contains("welcome email bounced"));
        assert_eq!(returned.user_name, event.user_name);
        assert_eq!(returned.extra, event.extra);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
