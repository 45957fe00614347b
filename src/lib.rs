#![recursion_limit = "1024"]
use std::process::{Command, ExitStatus};
use std::{fmt, path::PathBuf};

use itertools::Itertools;
use log::{debug, info};

use crate::errors::*;

pub mod args;
pub mod history;
pub mod policy;

pub use history::{load, TradeRecord};
pub use policy::{DatePolicy, KindPolicy};

pub mod errors {
    error_chain::error_chain! {
        errors {
            FileNotFound(path: String) {
                description("cannot open history file")
                display("Cannot open history file {}", path)
            }
            MalformedRow(line: u64, detail: String) {
                description("malformed history row")
                display("Malformed row at line {}: {}", line, detail)
            }
            DateParse(line: u64, date: String) {
                description("cannot parse trade date")
                display("Cannot parse date '{}' at line {}, expected DD/MM/YYYY", date, line)
            }
            Spawn(program: String) {
                description("cannot start external command")
                display("Cannot start {}", program)
            }
            ExternalCommandFailure(index: usize, command: String, code: Option<i32>) {
                description("external command failed")
                display("Trade #{} failed with {}: {}",
                    index + 1,
                    match code {
                        Some(c) => format!("exit status {}", c),
                        None => "a signal".to_owned(),
                    },
                    command)
            }
        }
    }
}

/// The trading CLI built next to this tool.
pub const DEFAULT_PROGRAM: &str = "./target/release/cli";

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub program: PathBuf,
    pub kind: KindPolicy,
    pub date: DatePolicy,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            program: PathBuf::from(DEFAULT_PROGRAM),
            kind: KindPolicy::Map,
            date: DatePolicy::Timestamp,
        }
    }
}

/// A program and its argument list. Never goes through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.program.to_string_lossy(),
            self.args.iter().join(" ")
        )
    }
}

pub struct Replayer {
    pub config: ReplayConfig,
}

impl Replayer {
    pub fn new(config: ReplayConfig) -> Replayer {
        Replayer { config }
    }

    /// `<command> <symbol> <quantity> <price> <date>` for the record at `index`.
    pub fn to_invocation(&self, record: &TradeRecord, index: usize) -> Result<Invocation> {
        let date = self
            .config
            .date
            .format(&record.date, index)
            .ok_or_else(|| ErrorKind::DateParse(record.line, record.date.clone()))?;

        Ok(Invocation {
            program: self.config.program.clone(),
            args: vec![
                self.config.kind.command(&record.kind).to_owned(),
                record.symbol.clone(),
                record.quantity.clone(),
                record.price.clone(),
                date,
            ],
        })
    }

    /// Builds every invocation up front so a bad row fails before anything runs.
    pub fn plan(&self, records: &[TradeRecord]) -> Result<Vec<Invocation>> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| self.to_invocation(r, i))
            .collect()
    }

    /// Runs the batch in order, waiting for each child. Stops at the first
    /// non-zero exit; what already ran stays done.
    pub fn replay(&self, records: &[TradeRecord]) -> Result<Option<ExitStatus>> {
        let invocations = self.plan(records)?;
        let total = invocations.len();
        let mut last = None;

        for (i, invocation) in invocations.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, invocation);

            let status = invocation.command().status().chain_err(|| {
                ErrorKind::Spawn(invocation.program.to_string_lossy().into_owned())
            })?;
            debug!("[{}/{}] {}", i + 1, total, status);

            if !status.success() {
                error_chain::bail!(ErrorKind::ExternalCommandFailure(
                    i,
                    invocation.to_string(),
                    status.code()
                ));
            }
            last = Some(status);
        }

        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(symbol: &str, date: &str, kind: &str) -> TradeRecord {
        TradeRecord {
            symbol: symbol.to_owned(),
            date: date.to_owned(),
            kind: kind.to_owned(),
            quantity: "10".to_owned(),
            price: "125.50".to_owned(),
            line: 2,
        }
    }

    fn replayer(kind: KindPolicy, date: DatePolicy) -> Replayer {
        Replayer::new(ReplayConfig {
            program: PathBuf::from("cli"),
            kind,
            date,
        })
    }

    #[test]
    fn reversed_date_invocation() -> Result<()> {
        let r = replayer(KindPolicy::Map, DatePolicy::Reverse);
        let inv = r.to_invocation(&record("AAPL", "01/03/2021", "C"), 0)?;
        assert_eq!("buy AAPL 10 125.50 2021-03-01", inv.args.join(" "));
        assert_eq!("cli buy AAPL 10 125.50 2021-03-01", inv.to_string());
        Ok(())
    }

    #[test]
    fn timestamped_invocations_follow_index() -> Result<()> {
        let r = replayer(KindPolicy::Map, DatePolicy::Timestamp);
        let records = vec![
            record("AAPL", "01/03/2021", "C"),
            record("AAPL", "01/03/2021", "V"),
        ];
        let plan = r.plan(&records)?;
        assert_eq!(
            vec!["buy", "AAPL", "10", "125.50", "2021-03-01 00:00:00"],
            plan[0].args
        );
        assert_eq!(
            vec!["sell", "AAPL", "10", "125.50", "2021-03-01 00:00:01"],
            plan[1].args
        );
        Ok(())
    }

    #[test]
    fn raw_policies_pass_tokens_through() -> Result<()> {
        let r = replayer(KindPolicy::Raw, DatePolicy::Raw);
        let inv = r.to_invocation(&record("AAPL", "2021-03-01 10:00:00", "sell"), 4)?;
        assert_eq!(
            vec!["sell", "AAPL", "10", "125.50", "2021-03-01 10:00:00"],
            inv.args
        );
        Ok(())
    }

    #[test]
    fn bad_date_fails_the_whole_plan() {
        let r = replayer(KindPolicy::Map, DatePolicy::Timestamp);
        let records = vec![
            record("AAPL", "01/03/2021", "C"),
            TradeRecord {
                line: 3,
                ..record("AAPL", "2021-03-01", "C")
            },
        ];
        match r.plan(&records) {
            Err(Error(ErrorKind::DateParse(3, date), _)) => assert_eq!("2021-03-01", date),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_batch_replays_nothing() -> Result<()> {
        let r = replayer(KindPolicy::Map, DatePolicy::Timestamp);
        assert_eq!(None, r.replay(&[])?);
        Ok(())
    }

    #[test]
    fn failure_message_names_the_trade() {
        let e: Error = ErrorKind::ExternalCommandFailure(1, "cli sell X 1 2 d".to_owned(), Some(3)).into();
        assert_eq!("Trade #2 failed with exit status 3: cli sell X 1 2 d", e.to_string());
    }
}
