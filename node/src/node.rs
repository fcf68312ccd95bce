//! Wiring of an LMDB-backed ledger node.

use std::sync::Arc;

use tabcoin_ledger::BalanceProjector;
use tabcoin_store::{BalanceEventStore, ContentDirectory};
use tabcoin_store_lmdb::{check_data_dir, check_integrity, IntegrityReport, LmdbEnvironment};
use tabcoin_types::{Clock, SystemClock};

use crate::config::NodeConfig;
use crate::metrics::VoteMetrics;
use crate::orchestrator::VoteOrchestrator;
use crate::serializer::ConcurrencySerializer;
use crate::NodeError;

/// A ledger node: one LMDB environment and the orchestrator that owns all
/// writes to it.
///
/// Only one node may open a data directory at a time; the per-voter exclusive
/// sections are in-process.
pub struct TabcoinNode {
    config: NodeConfig,
    environment: LmdbEnvironment,
    orchestrator: VoteOrchestrator,
    metrics: Option<Arc<VoteMetrics>>,
}

impl TabcoinNode {
    /// Open (or create) the node's data directory using the wall clock.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        check_data_dir(&config.data_dir).map_err(NodeError::Config)?;
        let environment = LmdbEnvironment::open(
            &config.data_dir,
            tabcoin_store_lmdb::environment::REQUIRED_DBS,
            config.map_size_bytes(),
        )?;

        let metrics = config.enable_metrics.then(|| Arc::new(VoteMetrics::new()));

        let mut serializer = ConcurrencySerializer::new(config.serializer.clone());
        if let Some(m) = &metrics {
            serializer = serializer.with_metrics(Arc::clone(m));
        }

        let store: Arc<dyn BalanceEventStore> = Arc::new(environment.balance_store());
        let directory: Arc<dyn ContentDirectory> = Arc::new(environment.content_store());
        let mut orchestrator = VoteOrchestrator::new(
            store,
            directory,
            clock,
            config.policy.clone(),
            Arc::new(serializer),
        );
        if let Some(m) = &metrics {
            orchestrator = orchestrator.with_metrics(Arc::clone(m));
        }

        tracing::info!(
            data_dir = %config.data_dir.display(),
            vote_cost = config.policy.vote_cost,
            repeat_vote_limit = config.policy.repeat_vote_limit,
            metrics = config.enable_metrics,
            "ledger node ready"
        );

        Ok(Self {
            config,
            environment,
            orchestrator,
            metrics,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &VoteOrchestrator {
        &self.orchestrator
    }

    pub fn projector(&self) -> &BalanceProjector {
        self.orchestrator.projector()
    }

    pub fn metrics(&self) -> Option<&Arc<VoteMetrics>> {
        self.metrics.as_ref()
    }

    /// Verify every database and recompute every materialised balance.
    pub fn check_integrity(&self) -> Result<IntegrityReport, NodeError> {
        let report = check_integrity(&self.environment)?;
        if report.is_healthy() {
            tracing::info!(
                databases = report.databases_checked,
                entries = report.total_entries,
                balances = report.balances_checked,
                "integrity check passed"
            );
        } else {
            tracing::warn!(errors = report.errors.len(), "integrity check found problems");
        }
        Ok(report)
    }
}
