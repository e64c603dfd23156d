//! Shapes of the identity provider's pre-signup trigger.
//!
//! Only the fields the hook reads are typed. Everything else the provider sends
//! is kept in the `extra` maps so the event goes back out with its original shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FAILURE_STATUS_CODE: u16 = 400;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<SignupRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SignupResponse>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_attributes: Option<UserAttributes>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The provider's `response` object. Provider keys such as `autoConfirmUser`
/// stay in `extra`; the hook only ever adds `statusCode` and `body`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ErrorBody>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub stack: String,
}

/// Host invocation context, passed through to sub-handlers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    #[serde(
        default,
        alias = "awsRequestId",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Invocation deadline in milliseconds since the Unix epoch, when the host gives one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignupEvent {
    pub fn new(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
            request: Some(SignupRequest {
                user_attributes: Some(UserAttributes {
                    email: Some(email.into()),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            response: None,
            extra: Map::new(),
        }
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.request
            .as_ref()?
            .user_attributes
            .as_ref()?
            .email
            .as_deref()
    }

    /// The failure attached by the hook, if any.
    pub fn failure(&self) -> Option<&ErrorDetail> {
        let response = self.response.as_ref()?;
        if response.status_code != Some(FAILURE_STATUS_CODE) {
            return None;
        }
        response.body.as_ref()?.errors.first()
    }

    /// Marks the event as failed. Any provider keys already under `response` are kept.
    pub fn attach_failure(&mut self, detail: ErrorDetail) {
        let response = self.response.get_or_insert_with(SignupResponse::default);
        response.status_code = Some(FAILURE_STATUS_CODE);
        response.body = Some(ErrorBody {
            errors: vec![detail],
        });
    }
}
