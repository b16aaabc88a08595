//! Protocol boundary
//!
//! JSON-RPC 2.0 envelopes, the method router, and the line-delimited
//! transports that feed it.
//!
//! ```text
//! ┌──────────────┐   {"jsonrpc":"2.0",...}   ┌───────────────┐      ┌────────────────────┐
//! │    Client    │◄──── stdio / tcp ────────►│ MessageRouter │─────►│ CapabilityRegistry │
//! └──────────────┘     one JSON per line     └───────────────┘      └────────────────────┘
//! ```

pub mod envelope;
pub mod router;
pub mod transport;

pub use envelope::{codes, JsonRpcRequest, JsonRpcResponse, RpcError, JSONRPC_VERSION};
pub use router::MessageRouter;
pub use transport::{serve, serve_lines, serve_stdio, serve_tcp};
