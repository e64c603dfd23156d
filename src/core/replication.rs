//! Replicates a new user into the GraphQL data store with the `createUser` mutation.
//!
//! The call never raises: every failure comes back as [`MutationOutcome::Failed`]
//! for the dispatcher to attach to the event.

use crate::core::contracts::GraphqlTransport;
use crate::core::error_signup::SignupError;
use crate::core::event::SignupEvent;
use crate::core::settings::{GRAPHQL_API_KEY_ENV, GRAPHQL_ENDPOINT_ENV, HookSettings};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CREATE_USER_MUTATION: &str = r#"
    mutation CREATE_USER($input: CreateUserInput!) {
      createUser(input: $input) {
        id
        email
      }
    }
  "#;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRequest {
    pub query: &'static str,
    pub variables: MutationVariables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationVariables {
    pub input: CreateUserInput,
}

/// Missing values are sent as `null`; the data store decides whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserInput {
    pub id: Option<String>,
    pub email: Option<String>,
}

impl MutationRequest {
    pub fn create_user(event: &SignupEvent) -> Self {
        Self {
            query: CREATE_USER_MUTATION,
            variables: MutationVariables {
                input: CreateUserInput {
                    id: event.user_name().map(str::to_string),
                    email: event.email().map(str::to_string),
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    /// Usually a list, but any non-empty value counts as an error report.
    #[serde(default)]
    errors: Option<Value>,
}

fn reports_errors(errors: &Value) -> bool {
    match errors {
        Value::Null | Value::Bool(false) => false,
        Value::Array(list) => !list.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(text) => !text.is_empty(),
        Value::Bool(true) | Value::Number(_) => true,
    }
}

#[derive(Debug)]
pub enum MutationOutcome {
    /// The `data` object of a response without errors.
    Created(Value),
    Failed(SignupError),
}

impl MutationOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, MutationOutcome::Created(_))
    }

    pub fn failure(&self) -> Option<&SignupError> {
        match self {
            MutationOutcome::Created(_) => None,
            MutationOutcome::Failed(err) => Some(err),
        }
    }
}

/// Interprets a raw GraphQL response body.
pub fn parse_response(body: &[u8]) -> MutationOutcome {
    let parsed: GraphqlResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(err) => return MutationOutcome::Failed(SignupError::InvalidResponse(err)),
    };

    match parsed.errors {
        Some(errors) if reports_errors(&errors) => {
            MutationOutcome::Failed(SignupError::Logical(errors.to_string()))
        }
        _ => MutationOutcome::Created(parsed.data.unwrap_or(Value::Null)),
    }
}

/// Sends one `createUser` mutation for `event`. No retries.
pub async fn replicate_user(
    settings: &HookSettings,
    transport: &dyn GraphqlTransport,
    event: &SignupEvent,
) -> MutationOutcome {
    let request = MutationRequest::create_user(event);

    #[cfg(feature = "logging")]
    log::debug!(
        "SignupHook. createUser variables: id={:?} email={:?}",
        request.variables.input.id,
        request.variables.input.email
    );

    let Some(endpoint) = settings.graphql_endpoint.as_deref() else {
        return MutationOutcome::Failed(SignupError::MissingSetting(GRAPHQL_ENDPOINT_ENV));
    };
    let Some(api_key) = settings.graphql_api_key.as_deref() else {
        return MutationOutcome::Failed(SignupError::MissingSetting(GRAPHQL_API_KEY_ENV));
    };

    let outcome = match transport.post(endpoint, api_key, &request).await {
        Ok(body) => parse_response(&body),
        Err(err) => MutationOutcome::Failed(err),
    };

    #[cfg(feature = "logging")]
    {
        match &outcome {
            MutationOutcome::Created(data) => {
                log::info!("SignupHook. createUser succeeded: {}", data)
            }
            MutationOutcome::Failed(err) => log::error!("SignupHook. createUser failed: {}", err),
        }
    }

    outcome
}

/// [`GraphqlTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestTransport {
    async fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        request: &MutationRequest,
    ) -> Result<Vec<u8>, SignupError> {
        let response = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(SignupError::Transport)?;

        let body = response.bytes().await.map_err(SignupError::Transport)?;
        Ok(body.to_vec())
    }
}
