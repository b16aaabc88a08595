//! Switchboard: Multi-Agent JSON-RPC Backend
//!
//! Agents register tools and resources into a shared capability registry. An
//! orchestrator owns the agents, relays events between them, and exposes the
//! registry through a JSON-RPC message router over stdio or TCP.

pub mod agent;
pub mod agents;
pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod protocol;
pub mod queue;
pub mod tooling;
pub mod types;

pub use agent::{Agent, AgentBehavior, AgentContext, AgentEvent, AgentState, AgentStatus};
pub use capability::{CapabilityRegistry, ResourceDescriptor, ToolDescriptor, ToolOutcome};
pub use config::{ConfigLoader, SwitchboardConfig};
pub use context::SharedContext;
pub use error::ApiError;
pub use orchestrator::Orchestrator;
pub use protocol::{JsonRpcRequest, JsonRpcResponse, MessageRouter};
pub use queue::{QueueStats, WorkProcessor, WorkQueue};
