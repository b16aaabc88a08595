//! Orchestrator
//!
//! Owns the capability registry, the message router, the shared context, and
//! the set of registered agents. Agent events flow over one mpsc channel into a
//! relay task that fans configured events out to every other running agent.

mod routes;

use crate::agent::{event_channel, Agent, AgentEnvelope, AgentEvent, AgentLink, AgentStatus};
use crate::capability::CapabilityRegistry;
use crate::config::OrchestratorConfig;
use crate::context::SharedContext;
use crate::error::ApiError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, MessageRouter};
use crate::types::AgentId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Source id used for notifications that do not originate from an agent
pub const ORCHESTRATOR_SOURCE: &str = "orchestrator";

/// Registered agents in registration order, plus the order they were started in
#[derive(Default)]
pub(crate) struct AgentTable {
    agents: RwLock<Vec<Arc<Agent>>>,
    start_order: Mutex<Vec<AgentId>>,
}

impl AgentTable {
    pub(crate) fn get(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.read().iter().find(|a| a.id() == id).cloned()
    }

    pub(crate) fn require(&self, id: &str) -> Result<Arc<Agent>, ApiError> {
        self.get(id)
            .ok_or_else(|| ApiError::AgentNotFound(id.to_string()))
    }

    /// Clone of the agent list, safe to iterate across await points
    pub(crate) fn snapshot(&self) -> Vec<Arc<Agent>> {
        self.agents.read().clone()
    }

    /// Insert or replace in place, returning the replaced agent
    fn upsert(&self, agent: Arc<Agent>) -> Option<Arc<Agent>> {
        let mut agents = self.agents.write();
        match agents.iter_mut().find(|a| a.id() == agent.id()) {
            Some(slot) => Some(std::mem::replace(slot, agent)),
            None => {
                agents.push(agent);
                None
            }
        }
    }

    fn remove(&self, id: &str) -> Option<Arc<Agent>> {
        self.forget_started(id);
        let mut agents = self.agents.write();
        let index = agents.iter().position(|a| a.id() == id)?;
        Some(agents.remove(index))
    }

    fn forget_started(&self, id: &str) {
        self.start_order.lock().retain(|started| started != id);
    }

    pub(crate) fn mark_started(&self, id: &str) {
        let mut order = self.start_order.lock();
        if !order.iter().any(|started| started == id) {
            order.push(id.to_string());
        }
    }

    fn take_start_order(&self) -> Vec<AgentId> {
        std::mem::take(&mut *self.start_order.lock())
    }

    pub(crate) fn statuses(&self) -> Vec<AgentStatus> {
        self.snapshot().iter().map(|a| a.status()).collect()
    }
}

/// Deliver `event` to every running agent not listed in `exclude`.
///
/// Returns the ids of the agents the event was delivered to. Handler failures
/// are logged and do not stop the fan-out.
async fn broadcast(
    agents: Vec<Arc<Agent>>,
    source: &str,
    event: &AgentEvent,
    exclude: &[&str],
) -> Vec<AgentId> {
    let mut delivered = Vec::new();
    for agent in agents {
        if exclude.contains(&agent.id()) || !agent.is_running() {
            continue;
        }
        match agent.deliver(source, event).await {
            Ok(true) => delivered.push(agent.id().to_string()),
            Ok(false) => {}
            Err(e) => {
                warn!(
                    agent_id = %agent.id(),
                    event = %event.name(),
                    error = %e,
                    "Agent failed to handle event"
                );
                delivered.push(agent.id().to_string());
            }
        }
    }
    delivered
}

struct RelayTask {
    stop: Arc<Notify>,
    handle: JoinHandle<mpsc::UnboundedReceiver<AgentEnvelope>>,
}

/// Top-level coordinator for agents, capabilities, and routing
pub struct Orchestrator {
    registry: Arc<CapabilityRegistry>,
    router: Arc<MessageRouter>,
    context: SharedContext,
    agents: Arc<AgentTable>,
    relay_events: Arc<Vec<String>>,
    events_tx: mpsc::UnboundedSender<AgentEnvelope>,
    /// Held here while the relay is not running
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<AgentEnvelope>>>,
    relay: Mutex<Option<RelayTask>>,
    running: RwLock<bool>,
}

impl Orchestrator {
    pub fn new(config: &OrchestratorConfig) -> Self {
        let (events_tx, events_rx) = event_channel();
        Self {
            registry: Arc::new(CapabilityRegistry::new()),
            router: Arc::new(MessageRouter::new()),
            context: SharedContext::new(),
            agents: Arc::new(AgentTable::default()),
            relay_events: Arc::new(config.relay_events.clone()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            relay: Mutex::new(None),
            running: RwLock::new(false),
        }
    }

    pub fn registry(&self) -> Arc<CapabilityRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.router)
    }

    pub fn context(&self) -> SharedContext {
        self.context.clone()
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    pub fn agent(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.get(id)
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents
            .snapshot()
            .iter()
            .map(|a| a.id().to_string())
            .collect()
    }

    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        self.agents.statuses()
    }

    /// Register an agent under its id.
    ///
    /// A duplicate id overwrites the previous agent with a warning. The previous
    /// agent is stopped and detached and its capabilities are removed before the
    /// new agent's current tools and resources are pulled into the registry.
    pub async fn register_agent(&self, agent: Arc<Agent>) -> Result<(), ApiError> {
        let id = agent.id().to_string();

        agent.attach(AgentLink {
            registry: Arc::clone(&self.registry),
            context: self.context.clone(),
            events: self.events_tx.clone(),
        });

        if let Some(previous) = self.agents.upsert(Arc::clone(&agent)) {
            warn!(agent_id = %id, "Agent already registered, overwriting");
            if !Arc::ptr_eq(&previous, &agent) {
                if let Err(e) = previous.stop().await {
                    warn!(agent_id = %id, error = %e, "Replaced agent failed to stop");
                }
                previous.detach();
                self.agents.forget_started(&id);
            }
            self.registry.unregister_owned_by(&id);
        }

        for tool in agent.tools() {
            self.registry.register_tool(tool)?;
        }
        for resource in agent.resources() {
            self.registry.register_resource(resource)?;
        }

        info!(agent_id = %id, kind = %agent.kind(), "Registered agent");
        Ok(())
    }

    /// Stop and remove an agent along with every capability it owns.
    ///
    /// Returns `false` when no agent has that id.
    pub async fn unregister_agent(&self, id: &str) -> Result<bool, ApiError> {
        let Some(agent) = self.agents.get(id) else {
            warn!(agent_id = %id, "Agent not registered, ignoring unregister");
            return Ok(false);
        };

        if let Err(e) = agent.stop().await {
            warn!(agent_id = %id, error = %e, "Agent failed to stop during unregister");
        }

        let (tools, resources) = self.registry.unregister_owned_by(id);
        self.agents.remove(id);
        agent.detach();

        info!(agent_id = %id, tools, resources, "Unregistered agent");
        Ok(true)
    }

    /// Install the default routes, start the event relay, then start every
    /// agent in registration order.
    ///
    /// Aborts on the first agent that fails to start. Agents started before the
    /// failure stay tracked so `shutdown` can stop them.
    pub async fn start(&self) -> Result<(), ApiError> {
        {
            let mut running = self.running.write();
            if *running {
                warn!("Orchestrator already running, ignoring start");
                return Ok(());
            }
            *running = true;
        }

        routes::install(
            &self.router,
            Arc::clone(&self.registry),
            Arc::clone(&self.agents),
            self.context.clone(),
        );
        self.spawn_relay();

        for agent in self.agents.snapshot() {
            agent.start().await?;
            self.agents.mark_started(agent.id());
        }

        info!(
            agents = self.agents.snapshot().len(),
            tools = self.registry.list_tools().len(),
            resources = self.registry.list_resources().len(),
            "Orchestrator started"
        );
        Ok(())
    }

    /// Stop started agents in reverse start order, then tear down the relay
    /// and the routes.
    ///
    /// Safe to call after a partial startup or when never started. Agent
    /// failures are logged and the remaining teardown continues.
    pub async fn shutdown(&self) {
        for id in self.agents.take_start_order().into_iter().rev() {
            let Some(agent) = self.agents.get(&id) else {
                continue;
            };
            if let Err(e) = agent.stop().await {
                warn!(agent_id = %id, error = %e, "Agent failed to stop during shutdown");
            }
        }

        self.stop_relay().await;
        self.router.clear();
        *self.running.write() = false;
        info!("Orchestrator shut down");
    }

    pub async fn start_agent(&self, id: &str) -> Result<AgentStatus, ApiError> {
        let agent = self.agents.require(id)?;
        agent.start().await?;
        self.agents.mark_started(id);
        Ok(agent.status())
    }

    pub async fn stop_agent(&self, id: &str) -> Result<AgentStatus, ApiError> {
        let agent = self.agents.require(id)?;
        agent.stop().await?;
        Ok(agent.status())
    }

    /// Deliver a custom event to every running agent not in `exclude`.
    ///
    /// Stopped agents are skipped and never see the event later.
    pub async fn notify_agents(
        &self,
        event_type: &str,
        data: Value,
        exclude: &[&str],
    ) -> Vec<AgentId> {
        let event = AgentEvent::custom(event_type, data);
        broadcast(self.agents.snapshot(), ORCHESTRATOR_SOURCE, &event, exclude).await
    }

    /// Route one request through the router
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.router.route_message(request).await
    }

    fn spawn_relay(&self) {
        let Some(mut rx) = self.events_rx.lock().take() else {
            return;
        };

        let stop = Arc::new(Notify::new());
        let agents = Arc::clone(&self.agents);
        let relay_events = Arc::clone(&self.relay_events);

        let handle = tokio::spawn({
            let stop = Arc::clone(&stop);
            async move {
                debug!("Event relay started");
                loop {
                    tokio::select! {
                        _ = stop.notified() => break,
                        envelope = rx.recv() => match envelope {
                            Some(envelope) => relay(&agents, &relay_events, envelope).await,
                            None => break,
                        },
                    }
                }
                // Flush what was emitted during shutdown
                while let Ok(envelope) = rx.try_recv() {
                    relay(&agents, &relay_events, envelope).await;
                }
                debug!("Event relay stopped");
                rx
            }
        });

        *self.relay.lock() = Some(RelayTask { stop, handle });
    }

    async fn stop_relay(&self) {
        let task = self.relay.lock().take();
        let Some(task) = task else {
            return;
        };

        task.stop.notify_one();
        match task.handle.await {
            Ok(rx) => *self.events_rx.lock() = Some(rx),
            Err(e) => warn!(error = %e, "Event relay ended abnormally"),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&OrchestratorConfig::default())
    }
}

async fn relay(agents: &AgentTable, relay_events: &[String], envelope: AgentEnvelope) {
    let AgentEnvelope { source, event } = envelope;
    let name = event.name();

    if relay_events.iter().any(|relayed| relayed == name) {
        let delivered = broadcast(agents.snapshot(), &source, &event, &[source.as_str()]).await;
        debug!(
            source = %source,
            event = %name,
            recipients = delivered.len(),
            "Relayed event"
        );
        return;
    }

    match &event {
        AgentEvent::ToolRegistered { name } => {
            debug!(agent_id = %source, tool = %name, "Agent announced tool")
        }
        AgentEvent::ResourceRegistered { name } => {
            debug!(agent_id = %source, resource = %name, "Agent announced resource")
        }
        _ => debug!(agent_id = %source, event = %name, "Agent event"),
    }
}
