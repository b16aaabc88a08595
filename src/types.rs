//! Core types shared across the switchboard crate.

/// AgentId: Unique, immutable agent identifier
pub type AgentId = String;

/// Name of a registered tool, resource, or route
pub type CapabilityName = String;

/// Name of the key under which the last completed analysis is published
pub const LAST_ANALYSIS_KEY: &str = "analysis:last";

/// Event emitted by the content-analysis agent after each analysis
pub const ANALYSIS_COMPLETED: &str = "analysis-completed";
