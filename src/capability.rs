//! Capability Registry
//!
//! Shared directory of every tool and resource exposed by the running agents.
//! Tools are invokable actions; resources are queryable data sources.

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    Handler, HandlerFuture, ResourceDescriptor, ResourceDescriptorBuilder, ResourceInfo,
    ToolDescriptor, ToolDescriptorBuilder, ToolInfo, ToolOutcome,
};
pub use registry::CapabilityRegistry;

use std::any::Any;

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}
