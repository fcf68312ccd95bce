//! TabCoin ledger node: accepts votes and grants and serialises every
//! balance-mutating write per affected user.
//!
//! The node is the coordinator that:
//! - Resolves content ownership and rejects votes on unknown content
//! - Applies the repeat-vote throttle
//! - Runs the funds check and the three-event write inside a per-voter
//!   exclusive section
//! - Reports the updated content projection
//! - Exposes configuration, structured logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod orchestrator;
pub mod serializer;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::{NodeError, VoteError, VoteErrorKind};
pub use logging::{init_logging, LogFormat};
pub use metrics::VoteMetrics;
pub use node::TabcoinNode;
pub use orchestrator::VoteOrchestrator;
pub use serializer::{ConcurrencySerializer, SerializerConfig, SerializerError};
