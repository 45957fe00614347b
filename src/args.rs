use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::history::HISTORY_FILE;
use crate::policy::{DatePolicy, KindPolicy};
use crate::{ReplayConfig, DEFAULT_PROGRAM};

/// Replays a semicolon separated trade history through an external trading
/// CLI, one process per trade.
#[derive(Parser)]
#[clap(version)]
pub struct Opts {
    /// History file, unless given after the subcommand [default: history.csv]
    #[clap(short, long)]
    pub file: Option<PathBuf>,

    /// Trading executable to invoke [default: ./target/release/cli]
    #[clap(short, long)]
    pub program: Option<PathBuf>,

    /// How kind codes become commands (map, raw)
    #[clap(short, long, default_value = "map")]
    pub kind_policy: KindPolicy,

    /// How dates are rewritten (raw, timestamp, reverse)
    #[clap(short, long, default_value = "timestamp")]
    pub date_policy: DatePolicy,

    #[clap(short, long)]
    pub quiet: bool,
    /// Verbose mode (-v, -vv, -vvv, etc)
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: usize,
    /// Timestamp (sec, ms, ns, none)
    #[clap(short, long)]
    pub ts: Option<stderrlog::Timestamp>,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Replay every trade, stopping at the first failing one
    Run { file: Option<PathBuf> },
    /// Print the commands a run would execute
    Plan { file: Option<PathBuf> },
    /// Check that the history file is well formed
    Check { file: Option<PathBuf> },
    /// List the trades in the history file
    Trades { name_substring: Option<String> },
}

impl Opts {
    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            program: self
                .program
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
            kind: self.kind_policy,
            date: self.date_policy,
        }
    }

    /// Positional path first, then `--file`, then `history.csv`.
    pub fn history_file(&self) -> PathBuf {
        let positional = match &self.subcmd {
            SubCommand::Run { file } | SubCommand::Plan { file } | SubCommand::Check { file } => {
                file.as_ref()
            }
            SubCommand::Trades { .. } => None,
        };

        positional
            .or_else(|| self.file.as_ref())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(HISTORY_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_trading_cli() {
        let opts = Opts::parse_from(&["tradereplay", "run"]);
        let config = opts.replay_config();
        assert_eq!(PathBuf::from(DEFAULT_PROGRAM), config.program);
        assert_eq!(KindPolicy::Map, config.kind);
        assert_eq!(DatePolicy::Timestamp, config.date);
        assert_eq!(PathBuf::from("history.csv"), opts.history_file());
    }

    #[test]
    fn history_file_as_positional_argument() {
        let opts = Opts::parse_from(&["tradereplay", "run", "old/trades.csv"]);
        assert_eq!(PathBuf::from("old/trades.csv"), opts.history_file());

        let opts = Opts::parse_from(&["tradereplay", "-f", "a.csv", "check", "b.csv"]);
        assert_eq!(PathBuf::from("b.csv"), opts.history_file());

        let opts = Opts::parse_from(&["tradereplay", "-f", "a.csv", "plan"]);
        assert_eq!(PathBuf::from("a.csv"), opts.history_file());
    }

    #[test]
    fn policies_and_paths_from_flags() {
        let opts = Opts::parse_from(&[
            "tradereplay",
            "-f",
            "trades.csv",
            "--program",
            "/usr/local/bin/stocks",
            "-k",
            "raw",
            "--date-policy",
            "reverse",
            "-vv",
            "trades",
            "aapl",
        ]);
        let config = opts.replay_config();
        assert_eq!(PathBuf::from("trades.csv"), opts.history_file());
        assert_eq!(PathBuf::from("/usr/local/bin/stocks"), config.program);
        assert_eq!(KindPolicy::Raw, config.kind);
        assert_eq!(DatePolicy::Reverse, config.date);
        assert_eq!(2, opts.verbose);
        match opts.subcmd {
            SubCommand::Trades { name_substring } => {
                assert_eq!(Some("aapl".to_owned()), name_substring)
            }
            _ => panic!("expected trades"),
        }
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Opts::try_parse_from(&["tradereplay", "-d", "iso", "run"]).is_err());
    }
}
