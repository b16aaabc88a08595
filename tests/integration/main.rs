//! Integration tests for the switchboard multi-agent backend

mod capability_properties;
mod config_files;
mod content_analysis;
mod orchestrator_flow;
mod protocol_contracts;
mod support;
