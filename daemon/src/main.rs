//! TabCoin daemon: command-line access to an LMDB-backed ledger node.
//!
//! Every command prints a single JSON document on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use tabcoin_node::{init_logging, NodeConfig, TabcoinNode, VoteError, VoteErrorKind};
use tabcoin_types::{
    BalanceType, ContentId, ContentTabcoins, RecipientId, Timestamp, UserBalances, UserId,
    VoteKind, VoteRequest,
};

#[derive(Parser)]
#[command(name = "tabcoin-daemon", about = "TabCoin reputation ledger")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// env vars and CLI flags override them.
    #[arg(long, env = "TABCOIN_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "TABCOIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TABCOIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TABCOIN_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Credit or debit an account outside of voting.
    Grant {
        /// User or content id receiving the grant.
        recipient: String,
        /// Amount to add (negative to remove).
        #[arg(long, allow_hyphen_values = true)]
        amount: i64,
        #[arg(long, default_value = "user:tabcoin")]
        balance_type: BalanceType,
        /// Free-form reference stored on the event.
        #[arg(long, default_value = "cli")]
        reference: String,
    },
    /// Register a content item under its owner.
    Publish {
        content: String,
        owner: String,
        /// Tabcoins credited to the content on publication.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        credit: i64,
    },
    /// Vote on a content item.
    Vote {
        voter: String,
        content: String,
        /// "credit" or "debit".
        kind: VoteKind,
        /// Justification, required for debit votes.
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show current balances.
    Balance {
        #[command(subcommand)]
        target: BalanceTarget,
    },
    /// Verify the databases and recompute every materialised balance.
    Check,
}

#[derive(clap::Subcommand)]
enum BalanceTarget {
    User { id: String },
    Content { id: String },
}

#[derive(Serialize)]
struct UserView<'a> {
    user: &'a str,
    #[serde(flatten)]
    balances: UserBalances,
}

#[derive(Serialize)]
struct ContentView<'a> {
    content: &'a str,
    #[serde(flatten)]
    projection: ContentTabcoins,
}

#[derive(Serialize)]
struct Rejection {
    error: VoteErrorKind,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_not_before: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_in: Option<String>,
}

impl From<&VoteError> for Rejection {
    fn from(e: &VoteError) -> Self {
        let retry = match e {
            VoteError::RepeatVoteThrottled { retry_not_before } => Some(*retry_not_before),
            _ => None,
        };
        Self {
            error: e.kind(),
            message: e.to_string(),
            retryable: e.is_retryable(),
            retry_not_before: retry.map(|t| t.as_secs()),
            retry_in: retry.map(|t| tabcoin_utils::format_wait(t, Timestamp::now())),
        }
    }
}

/// Layer the CLI over the configuration file. Clap has already applied env
/// vars to the flags, so this yields flags > env > file > defaults.
fn resolve_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path_str)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_rejection(e: &VoteError) -> anyhow::Result<ExitCode> {
    print_json(&Rejection::from(e))?;
    Ok(ExitCode::from(2))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match config.log_format() {
        Ok(format) => init_logging(format, &config.log_level)?,
        Err(e) => {
            tabcoin_utils::init_tracing();
            tracing::warn!(error = %e, "falling back to default logging");
        }
    }

    let node = TabcoinNode::open(config)?;
    let orchestrator = node.orchestrator();

    match cli.command {
        Command::Grant {
            recipient,
            amount,
            balance_type,
            reference,
        } => {
            let recipient = RecipientId::new(recipient);
            match orchestrator
                .grant(recipient.clone(), balance_type, amount, reference)
                .await
            {
                Ok(balance) => print_json(&serde_json::json!({
                    "recipient": recipient,
                    "balance_type": balance_type,
                    "balance": balance,
                }))?,
                Err(e) => return print_rejection(&e),
            }
        }
        Command::Publish {
            content,
            owner,
            credit,
        } => {
            let content_id = ContentId::new(content.as_str());
            match orchestrator
                .publish_content(&content_id, &UserId::new(owner), credit)
                .await
            {
                Ok(projection) => print_json(&ContentView {
                    content: &content,
                    projection,
                })?,
                Err(e) => return print_rejection(&e),
            }
        }
        Command::Vote {
            voter,
            content,
            kind,
            reason,
        } => {
            let request = VoteRequest {
                voter: UserId::new(voter),
                content: ContentId::new(content.as_str()),
                kind,
                reason,
            };
            request.validate().context("invalid vote request")?;
            match orchestrator.vote_on_content(request).await {
                Ok(projection) => print_json(&ContentView {
                    content: &content,
                    projection,
                })?,
                Err(e) => return print_rejection(&e),
            }
        }
        Command::Balance { target } => match target {
            BalanceTarget::User { id } => {
                let balances = node.projector().user_balances(&UserId::new(id.as_str()))?;
                print_json(&UserView {
                    user: &id,
                    balances,
                })?
            }
            BalanceTarget::Content { id } => {
                let projection = node
                    .projector()
                    .content_tabcoins(&ContentId::new(id.as_str()))?;
                print_json(&ContentView {
                    content: &id,
                    projection,
                })?
            }
        },
        Command::Check => {
            let report = node.check_integrity()?;
            print_json(&serde_json::json!({
                "healthy": report.is_healthy(),
                "databases_checked": report.databases_checked,
                "total_entries": report.total_entries,
                "balances_checked": report.balances_checked,
                "errors": report.errors,
            }))?;
            if !report.is_healthy() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
