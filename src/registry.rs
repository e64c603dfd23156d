/// Attribute macro for registering a signup handler under a module name.
/// Usage:
///   #[SignupHandler(name = "welcome-email")]
///   #[SignupHandler(name = "crm-sync", factory)]
///
/// The generated code registers through `ctor`, so the using crate must depend on it.
pub use signup_hook_macros::SignupHandler;

pub use crate::core::registry::{HandlerRegistry, global, handler};
