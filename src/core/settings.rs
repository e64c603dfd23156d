use crate::core::error_signup::SignupError;
use std::fmt;
use std::str::FromStr;

pub const MODULES_ENV: &str = "MODULES";
pub const GRAPHQL_ENDPOINT_ENV: &str = "GRAPHQL_ENDPOINT";
pub const GRAPHQL_API_KEY_ENV: &str = "GRAPHQL_API_KEY";
pub const DISPATCH_MODE_ENV: &str = "SIGNUP_DISPATCH_MODE";
pub const SIBLING_POLICY_ENV: &str = "SIGNUP_SIBLING_POLICY";

/// Names the hosting platform generates for the GraphQL API outputs.
pub const PLATFORM_GRAPHQL_ENDPOINT_ENV: &str = "API_AMPLIFYAUTH_GRAPHQLAPIENDPOINTOUTPUT";
pub const PLATFORM_GRAPHQL_API_KEY_ENV: &str = "API_AMPLIFYAUTH_GRAPHQLAPIKEYOUTPUT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Replicate the new user through the GraphQL mutation.
    #[default]
    Replicate,
    /// Run every configured sub-handler concurrently.
    FanOut,
}

impl FromStr for DispatchMode {
    type Err = SignupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replicate" => Ok(DispatchMode::Replicate),
            "fan-out" | "fanout" | "fan_out" => Ok(DispatchMode::FanOut),
            _ => Err(SignupError::InvalidSetting(
                DISPATCH_MODE_ENV,
                value.to_string(),
            )),
        }
    }
}

/// What happens to the other sub-handlers once one of them has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SiblingPolicy {
    /// Stop waiting for them and let them run to completion on their own.
    #[default]
    Detach,
    /// Abort them.
    Abort,
}

impl FromStr for SiblingPolicy {
    type Err = SignupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detach" => Ok(SiblingPolicy::Detach),
            "abort" => Ok(SiblingPolicy::Abort),
            _ => Err(SignupError::InvalidSetting(
                SIBLING_POLICY_ENV,
                value.to_string(),
            )),
        }
    }
}

/// Everything the hook reads from its environment, captured once at init.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HookSettings {
    pub modules: Option<String>,
    pub graphql_endpoint: Option<String>,
    pub graphql_api_key: Option<String>,
    pub mode: DispatchMode,
    pub sibling_policy: SiblingPolicy,
}

impl HookSettings {
    pub fn from_env() -> Result<Self, SignupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank GraphQL values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SignupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mode = match lookup(DISPATCH_MODE_ENV) {
            Some(value) => value.parse()?,
            None => DispatchMode::default(),
        };
        let sibling_policy = match lookup(SIBLING_POLICY_ENV) {
            Some(value) => value.parse()?,
            None => SiblingPolicy::default(),
        };

        Ok(Self {
            modules: lookup(MODULES_ENV),
            graphql_endpoint: non_blank(GRAPHQL_ENDPOINT_ENV)
                .or_else(|| non_blank(PLATFORM_GRAPHQL_ENDPOINT_ENV)),
            graphql_api_key: non_blank(GRAPHQL_API_KEY_ENV)
                .or_else(|| non_blank(PLATFORM_GRAPHQL_API_KEY_ENV)),
            mode,
            sibling_policy,
        })
    }
}

impl fmt::Debug for HookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSettings")
            .field("modules", &self.modules)
            .field("graphql_endpoint", &self.graphql_endpoint)
            .field(
                "graphql_api_key",
                &self.graphql_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("mode", &self.mode)
            .field("sibling_policy", &self.sibling_policy)
            .finish()
    }
}
