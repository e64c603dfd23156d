pub mod contracts;
pub mod dispatcher;
pub mod error_signup;
pub mod event;
pub mod factory;
pub mod initialization;
pub mod loader;
pub mod registry;
pub mod replication;
pub mod settings;

pub(crate) mod fan_out;
