//! Agents
//!
//! An agent is a lifecycle state machine plus the capability descriptors it was
//! built with. Domain behavior plugs in through the `AgentBehavior` hooks rather
//! than by subclassing.
//!
//! ```text
//! Created --initialize()--> Initialized --start()--> Running --stop()--> Stopped
//!                                                       ^                   |
//!                                                       +-----start()-------+
//! ```

pub mod base;
pub mod events;
pub mod lifecycle;

pub use base::{
    Agent, AgentBehavior, AgentBuilder, AgentContext, AgentLink, AgentStatus, NoopBehavior,
};
pub use events::{event_channel, AgentEnvelope, AgentEvent, EventEmitter};
pub use lifecycle::{AgentState, Transition};
