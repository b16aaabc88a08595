//! CLI Tooling
//!
//! Command-line interface for serving the switchboard and for one-shot tool
//! calls, resource reads, and listings against a locally started orchestrator.

use crate::agent::AgentStatus;
use crate::agents::register_default_agents;
use crate::capability::{ResourceInfo, ToolInfo};
use crate::config::{ServerConfig, SwitchboardConfig, TransportKind};
use crate::error::ApiError;
use crate::logging::{LogFormat, LogSink, LoggingConfig};
use crate::orchestrator::Orchestrator;
use crate::protocol;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Switchboard CLI - multi-agent JSON-RPC backend
#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Multi-agent backend exposing tools and resources over JSON-RPC")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<LogSink>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold logging flags into the loaded configuration
    pub fn apply_logging_overrides(&self, logging: &mut LoggingConfig) {
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            logging.format = format;
        }
        if let Some(output) = self.log_output {
            logging.output = output;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start every agent and serve JSON-RPC until EOF or Ctrl-C
    Serve {
        /// Transport (stdio, tcp)
        #[arg(long)]
        transport: Option<TransportKind>,
        /// Bind host for the tcp transport
        #[arg(long)]
        host: Option<String>,
        /// Bind port for the tcp transport
        #[arg(long)]
        port: Option<u16>,
    },
    /// List registered tools
    Tools {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List registered resources
    Resources {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show agent status
    Agents {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Invoke a tool once
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// Read a resource once
    Read {
        /// Resource name
        resource: String,
        /// Resource parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self, ApiError> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ApiError::Validation(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

fn parse_json_arg(raw: Option<&str>) -> Result<Value, ApiError> {
    match raw {
        None => Ok(json!({})),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::Validation(format!("--params is not valid JSON: {}", e))),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// CLI context owning the configuration and the orchestrator
pub struct CliContext {
    config: SwitchboardConfig,
    orchestrator: Arc<Orchestrator>,
}

impl CliContext {
    /// Build the orchestrator and register the built-in agents
    pub async fn new(config: SwitchboardConfig) -> Result<Self, ApiError> {
        let orchestrator = Arc::new(Orchestrator::new(&config.orchestrator));
        register_default_agents(&orchestrator, &config).await?;
        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn config(&self) -> &SwitchboardConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Execute a CLI command.
    ///
    /// The orchestrator is started first and always shut down afterwards, even
    /// when startup or the command fails.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let result = match self.orchestrator.start().await {
            Ok(()) => self.execute_inner(command).await,
            Err(e) => Err(e),
        };
        self.orchestrator.shutdown().await;
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Serve {
                transport,
                host,
                port,
            } => {
                let mut server = self.config.server.clone();
                if let Some(transport) = transport {
                    server.transport = *transport;
                }
                if let Some(host) = host {
                    server.host = host.clone();
                }
                if let Some(port) = port {
                    server.port = *port;
                }
                self.serve(server).await
            }
            Commands::Tools { format } => {
                let tools = self.orchestrator.registry().list_tools();
                match OutputFormat::parse(format)? {
                    OutputFormat::Json => Ok(pretty(&json!({ "tools": tools }))),
                    OutputFormat::Text => Ok(format_tools_table(&tools)),
                }
            }
            Commands::Resources { format } => {
                let resources = self.orchestrator.registry().list_resources();
                match OutputFormat::parse(format)? {
                    OutputFormat::Json => Ok(pretty(&json!({ "resources": resources }))),
                    OutputFormat::Text => Ok(format_resources_table(&resources)),
                }
            }
            Commands::Agents { format } => {
                let agents = self.orchestrator.agent_statuses();
                match OutputFormat::parse(format)? {
                    OutputFormat::Json => Ok(pretty(&json!({ "agents": agents }))),
                    OutputFormat::Text => Ok(format_agents_table(&agents)),
                }
            }
            Commands::Call { tool, params } => {
                let params = parse_json_arg(params.as_deref())?;
                let outcome = self.orchestrator.registry().invoke_tool(tool, params).await?;
                if let Some(message) = outcome.error_message() {
                    return Err(ApiError::handler(format!("{} failed: {}", tool, message)));
                }
                Ok(pretty(&outcome.content))
            }
            Commands::Read { resource, params } => {
                let params = parse_json_arg(params.as_deref())?;
                let contents = self
                    .orchestrator
                    .registry()
                    .get_resource(resource, params)
                    .await?;
                Ok(pretty(&contents))
            }
        }
    }

    /// Serve until the transport ends or Ctrl-C. Returns an empty string so
    /// nothing is written after the protocol stream.
    async fn serve(&self, server: ServerConfig) -> Result<String, ApiError> {
        let router = self.orchestrator.router();
        let answered = tokio::select! {
            result = protocol::serve(router, &server) => result?,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Interrupted, shutting down");
                0
            }
        };
        info!(answered, transport = ?server.transport, "Transport finished");
        Ok(String::new())
    }
}

fn format_tools_table(tools: &[ToolInfo]) -> String {
    if tools.is_empty() {
        return "No tools registered.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Tool", "Owner", "Description"]);
    for tool in tools {
        table.add_row(vec![
            tool.name.as_str(),
            tool.owner.as_deref().unwrap_or("-"),
            tool.description.as_str(),
        ]);
    }
    table.to_string()
}

fn format_resources_table(resources: &[ResourceInfo]) -> String {
    if resources.is_empty() {
        return "No resources registered.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Resource", "Owner", "Description"]);
    for resource in resources {
        table.add_row(vec![
            resource.name.as_str(),
            resource.owner.as_deref().unwrap_or("-"),
            resource.description.as_str(),
        ]);
    }
    table.to_string()
}

fn format_agents_table(agents: &[AgentStatus]) -> String {
    if agents.is_empty() {
        return "No agents registered.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Agent", "Kind", "State", "Tools", "Resources"]);
    for agent in agents {
        table.add_row(vec![
            agent.id.clone(),
            agent.kind.clone(),
            agent.state.to_string(),
            agent.tools.join(", "),
            agent.resources.join(", "),
        ]);
    }
    table.to_string()
}
