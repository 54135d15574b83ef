pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod memory;
pub mod model;
pub mod observability;
pub mod security;
pub mod server;

pub use agent::{Agent, AgentService, InvocationRequest, InvocationResponse};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use history::{merge, merge_with, Message, Role, TurnRecord};
