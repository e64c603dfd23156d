use crate::core::event::ErrorDetail;
use std::error::Error as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignupError {
    #[error(
        "SignupError: `MODULES` is not configured. Set it to a comma-delimited list of signup handler names."
    )]
    ModulesNotConfigured,

    #[error("SignupError: Invalid module list '{0}': module names must not be empty")]
    InvalidModuleList(String),

    #[error("SignupError: Module '{0}' is listed more than once")]
    DuplicateModule(String),

    #[error("SignupError: No signup handler registered for module '{0}'")]
    ModuleNotFound(String),

    #[error("SignupError: Cant build signup handler for module '{0}' error '{1}'")]
    HandlerFactoryFailed(String, String),

    #[error("SignupError: Signup handler registered already. Module '{0}' by handler '{1}'")]
    HandlerAlreadyRegistered(String, String),

    #[error("SignupError: Invalid value '{1}' for setting `{0}`")]
    InvalidSetting(&'static str, String),

    #[error(
        "SignupError: `{0}` has already been initialized. Initialization must only be called once."
    )]
    AlreadyInitialized(String),

    #[error(
        "SignupError: `{0}` has not been initialized. You must call `signup_hook::core::initialization::init()` before dispatching events."
    )]
    NotInitialized(String),

    #[error("SignupError: Setting `{0}` is not configured")]
    MissingSetting(&'static str),

    #[error("SignupError: Transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("SignupError: GraphQL response is not valid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("SignupError: GraphQL errors: {0}")]
    Logical(String),

    #[error("SignupError: Sub-handler '{0}' failed: {1}")]
    SubHandlerFailed(String, String),
}

impl SignupError {
    /// Errors that must stop the process from serving any event.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SignupError::ModulesNotConfigured
                | SignupError::InvalidModuleList(_)
                | SignupError::DuplicateModule(_)
                | SignupError::ModuleNotFound(_)
                | SignupError::HandlerFactoryFailed(_, _)
                | SignupError::HandlerAlreadyRegistered(_, _)
                | SignupError::InvalidSetting(_, _)
                | SignupError::AlreadyInitialized(_)
        )
    }

    /// The failure message as the caller sees it on the returned event.
    pub fn message(&self) -> String {
        match self {
            SignupError::Transport(err) => err.to_string(),
            SignupError::InvalidResponse(err) => err.to_string(),
            SignupError::Logical(errors) => errors.clone(),
            other => other.to_string(),
        }
    }

    /// Display of this error followed by every source in its chain. The direct
    /// source is skipped when the display already renders it.
    pub fn stack(&self) -> String {
        let mut stack = self.to_string();
        let mut source = match self {
            SignupError::Transport(_) | SignupError::InvalidResponse(_) => {
                self.source().and_then(|err| err.source())
            }
            _ => self.source(),
        };
        while let Some(err) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&err.to_string());
            source = err.source();
        }
        stack
    }
}

impl From<&SignupError> for ErrorDetail {
    fn from(err: &SignupError) -> Self {
        ErrorDetail {
            message: err.message(),
            stack: err.stack(),
        }
    }
}
