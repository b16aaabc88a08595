//! Agent base: lifecycle guards, capability registration, and event delivery.

use super::events::{AgentEnvelope, AgentEvent, EventEmitter};
use super::lifecycle::{AgentState, Transition};
use crate::capability::{CapabilityRegistry, ResourceDescriptor, ToolDescriptor};
use crate::context::SharedContext;
use crate::error::ApiError;
use crate::types::AgentId;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Domain hooks layered on top of the base lifecycle
#[async_trait]
pub trait AgentBehavior: Send + Sync {
    /// Runs before the agent is marked running
    async fn on_start(&self, _ctx: &AgentContext) -> Result<(), ApiError> {
        Ok(())
    }

    /// Runs before the agent is marked stopped; must cancel scheduled work
    async fn on_stop(&self, _ctx: &AgentContext) -> Result<(), ApiError> {
        Ok(())
    }

    /// Receives events relayed from other agents while running
    async fn handle_event(
        &self,
        _ctx: &AgentContext,
        _source: &str,
        _event: &AgentEvent,
    ) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Behavior with no domain hooks
pub struct NoopBehavior;

impl AgentBehavior for NoopBehavior {}

/// What the orchestrator hands an agent on registration
#[derive(Clone)]
pub struct AgentLink {
    pub registry: Arc<CapabilityRegistry>,
    pub context: SharedContext,
    pub events: mpsc::UnboundedSender<AgentEnvelope>,
}

/// Per-call view passed to behavior hooks
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub emitter: EventEmitter,
    pub shared: SharedContext,
}

impl AgentContext {
    pub fn emit(&self, event: AgentEvent) {
        self.emitter.emit(event);
    }
}

/// Serializable status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: AgentId,
    pub kind: String,
    pub state: AgentState,
    pub tools: Vec<String>,
    pub resources: Vec<String>,
}

/// A named, stateful unit exposing tools and resources
pub struct Agent {
    id: AgentId,
    kind: String,
    state: RwLock<AgentState>,
    declared_tools: Vec<ToolDescriptor>,
    declared_resources: Vec<ResourceDescriptor>,
    tools: RwLock<Vec<ToolDescriptor>>,
    resources: RwLock<Vec<ResourceDescriptor>>,
    behavior: Arc<dyn AgentBehavior>,
    link: RwLock<Option<AgentLink>>,
    /// Serializes initialize/start/stop across await points
    transition: Mutex<()>,
}

impl Agent {
    pub fn builder(id: impl Into<AgentId>) -> AgentBuilder {
        AgentBuilder {
            id: id.into(),
            kind: "generic".to_string(),
            tools: Vec::new(),
            resources: Vec::new(),
            behavior: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Tools registered so far
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.read().clone()
    }

    /// Resources registered so far
    pub fn resources(&self) -> Vec<ResourceDescriptor> {
        self.resources.read().clone()
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            id: self.id.clone(),
            kind: self.kind.clone(),
            state: self.state(),
            tools: self.tools.read().iter().map(|t| t.name.clone()).collect(),
            resources: self.resources.read().iter().map(|r| r.name.clone()).collect(),
        }
    }

    /// Bind the agent to an orchestrator's registry, context, and event channel
    pub fn attach(&self, link: AgentLink) {
        *self.link.write() = Some(link);
    }

    pub fn detach(&self) {
        *self.link.write() = None;
    }

    pub fn context(&self) -> AgentContext {
        let link = self.link.read();
        match link.as_ref() {
            Some(link) => AgentContext {
                agent_id: self.id.clone(),
                emitter: EventEmitter::new(self.id.clone(), link.events.clone()),
                shared: link.context.clone(),
            },
            None => AgentContext {
                agent_id: self.id.clone(),
                emitter: EventEmitter::detached(self.id.clone()),
                shared: SharedContext::new(),
            },
        }
    }

    fn emit(&self, event: AgentEvent) {
        self.context().emit(event);
    }

    /// Register a tool owned by this agent.
    ///
    /// Validates synchronously, replaces any local tool of the same name, pushes
    /// the tool into the attached registry, and emits `tool-registered`.
    pub fn register_tool(&self, mut tool: ToolDescriptor) -> Result<(), ApiError> {
        tool.validate()?;
        tool.owner = Some(self.id.clone());
        let name = tool.name.clone();

        let registry = self.link.read().as_ref().map(|l| Arc::clone(&l.registry));
        if let Some(registry) = registry {
            registry.register_tool(tool.clone())?;
        }

        {
            let mut tools = self.tools.write();
            tools.retain(|t| t.name != name);
            tools.push(tool);
        }

        debug!(agent_id = %self.id, tool = %name, "Agent registered tool");
        self.emit(AgentEvent::ToolRegistered { name });
        Ok(())
    }

    /// Register a resource owned by this agent
    pub fn register_resource(&self, mut resource: ResourceDescriptor) -> Result<(), ApiError> {
        resource.validate()?;
        resource.owner = Some(self.id.clone());
        let name = resource.name.clone();

        let registry = self.link.read().as_ref().map(|l| Arc::clone(&l.registry));
        if let Some(registry) = registry {
            registry.register_resource(resource.clone())?;
        }

        {
            let mut resources = self.resources.write();
            resources.retain(|r| r.name != name);
            resources.push(resource);
        }

        debug!(agent_id = %self.id, resource = %name, "Agent registered resource");
        self.emit(AgentEvent::ResourceRegistered { name });
        Ok(())
    }

    /// Register the declared capabilities. No-op once initialized.
    pub async fn initialize(&self) -> Result<(), ApiError> {
        let _guard = self.transition.lock().await;
        self.initialize_locked()
    }

    fn initialize_locked(&self) -> Result<(), ApiError> {
        let state = self.state();
        let Some(next) = state.next(Transition::Initialize) else {
            warn!(agent_id = %self.id, state = %state, "Agent already initialized, skipping");
            return Ok(());
        };

        for tool in &self.declared_tools {
            tool.validate()?;
        }
        for resource in &self.declared_resources {
            resource.validate()?;
        }
        for tool in &self.declared_tools {
            self.register_tool(tool.clone())?;
        }
        for resource in &self.declared_resources {
            self.register_resource(resource.clone())?;
        }

        *self.state.write() = next;
        info!(
            agent_id = %self.id,
            tools = self.declared_tools.len(),
            resources = self.declared_resources.len(),
            "Agent initialized"
        );
        Ok(())
    }

    /// Start the agent, initializing first if needed.
    ///
    /// Starting a running agent is a warning and a no-op. Initialization or
    /// `on_start` failures surface as `ApiError::Startup`.
    pub async fn start(&self) -> Result<(), ApiError> {
        let _guard = self.transition.lock().await;

        let state = self.state();
        let Some(next) = state.next(Transition::Start) else {
            warn!(agent_id = %self.id, state = %state, "Agent already running, ignoring start");
            return Ok(());
        };

        let startup_error = |e: ApiError| ApiError::Startup {
            agent_id: self.id.clone(),
            message: e.to_string(),
        };

        if !state.is_initialized() {
            self.initialize_locked().map_err(startup_error)?;
        }

        let ctx = self.context();
        self.behavior.on_start(&ctx).await.map_err(startup_error)?;

        *self.state.write() = next;
        info!(agent_id = %self.id, kind = %self.kind, "Agent started");
        ctx.emit(AgentEvent::Started);
        Ok(())
    }

    /// Stop a running agent.
    ///
    /// `on_stop` cleanup completes before the state flips. Stopping an agent
    /// that is not running is a warning and a no-op.
    pub async fn stop(&self) -> Result<(), ApiError> {
        let _guard = self.transition.lock().await;

        let state = self.state();
        let Some(next) = state.next(Transition::Stop) else {
            warn!(agent_id = %self.id, state = %state, "Agent not running, ignoring stop");
            return Ok(());
        };

        let ctx = self.context();
        if let Err(e) = self.behavior.on_stop(&ctx).await {
            warn!(agent_id = %self.id, error = %e, "Agent cleanup failed during stop");
        }

        *self.state.write() = next;
        info!(agent_id = %self.id, "Agent stopped");
        ctx.emit(AgentEvent::Stopped);
        Ok(())
    }

    /// Deliver an event from another agent.
    ///
    /// Returns `false` without invoking the behavior when the agent is not running.
    pub async fn deliver(&self, source: &str, event: &AgentEvent) -> Result<bool, ApiError> {
        if !self.is_running() {
            return Ok(false);
        }
        let ctx = self.context();
        self.behavior.handle_event(&ctx, source, event).await?;
        Ok(true)
    }
}

/// Builder supplying an agent's capabilities and behavior at construction
pub struct AgentBuilder {
    id: AgentId,
    kind: String,
    tools: Vec<ToolDescriptor>,
    resources: Vec<ResourceDescriptor>,
    behavior: Option<Arc<dyn AgentBehavior>>,
}

impl AgentBuilder {
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn resource(mut self, resource: ResourceDescriptor) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn behavior(mut self, behavior: Arc<dyn AgentBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn build(self) -> Result<Agent, ApiError> {
        if self.id.trim().is_empty() {
            return Err(ApiError::Validation("agent id cannot be empty".to_string()));
        }
        Ok(Agent {
            id: self.id,
            kind: self.kind,
            state: RwLock::new(AgentState::Created),
            declared_tools: self.tools,
            declared_resources: self.resources,
            tools: RwLock::new(Vec::new()),
            resources: RwLock::new(Vec::new()),
            behavior: self.behavior.unwrap_or_else(|| Arc::new(NoopBehavior)),
            link: RwLock::new(None),
            transition: Mutex::new(()),
        })
    }
}
