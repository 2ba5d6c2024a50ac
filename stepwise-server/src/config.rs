//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use stepwise::planner::PlannerConfig;
use stepwise::types::Chain;

/// Stepwise planning service.
#[derive(Debug, Clone, Parser)]
#[command(name = "stepwise-server")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "STEPWISE_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Chat-completion model backing the oracle.
    #[arg(short, long, env = "STEPWISE_MODEL", default_value = "gpt-4o")]
    pub model: String,

    /// Bound on a single oracle call, in seconds.
    #[arg(long, env = "STEPWISE_ORACLE_TIMEOUT", default_value_t = 60)]
    pub oracle_timeout_secs: u64,

    /// Sampling temperature passed to the model.
    #[arg(long, env = "STEPWISE_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Cap on the length of each model reply, in tokens.
    #[arg(long, env = "STEPWISE_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Directory for the daily-rotated JSON log.
    #[arg(long, env = "STEPWISE_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Chain used when a request carries no valid selector.
    #[arg(long, env = "STEPWISE_CHAIN", default_value_t = Chain::Solana)]
    pub chain: Chain,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Planner configuration derived from the arguments.
    #[must_use]
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::default()
            .with_oracle_timeout(Duration::from_secs(self.oracle_timeout_secs))
            .with_default_chain(self.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "stepwise-server",
            "--listen",
            "127.0.0.1:9000",
            "--model",
            "gpt-4o-mini",
            "--oracle-timeout-secs",
            "5",
            "--chain",
            "bsc",
            "--temperature",
            "0.2",
            "--max-tokens",
            "512",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(args.model, "gpt-4o-mini");
        assert_eq!(args.temperature, Some(0.2));
        assert_eq!(args.max_tokens, Some(512));
        assert_eq!(args.verbose, 2);

        let config = args.planner_config();
        assert_eq!(config.oracle_timeout, Duration::from_secs(5));
        assert_eq!(config.default_chain, Chain::Bsc);
    }

    #[test]
    fn test_unknown_chain_rejected() {
        assert!(Args::try_parse_from(["stepwise-server", "--chain", "dogechain"]).is_err());
    }
}
