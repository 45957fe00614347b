use std::{fmt, path};

use log::{debug, warn};
use serde::Deserialize;
use unicode_truncate::UnicodeTruncateStr;

use crate::errors::*;

pub const HISTORY_FILE: &str = "history.csv";

/// Number of `;` separated fields in a history row.
pub const FIELDS: usize = 5;

#[macro_export]
macro_rules! fmt_trade {
    () => {
        "{:>5}\t{:<10}\t{:<10}\t{:<5}\t{:>10}\t{:>10}"
    };
}

/// One row of the history file. Fields are kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub date: String,
    pub kind: String,
    pub quantity: String,
    pub price: String,
    /// 1-based line in the history file
    #[serde(skip)]
    pub line: u64,
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            fmt_trade!(),
            self.line,
            self.symbol.unicode_truncate(10).0,
            self.date.unicode_truncate(10).0,
            self.kind.unicode_truncate(5).0,
            self.quantity.unicode_truncate(10).0,
            self.price.unicode_truncate(10).0,
        )
    }
}

fn is_blank(raw_record: &csv::StringRecord) -> bool {
    raw_record.iter().all(|f| f.trim().is_empty()) && raw_record.len() == 1
}

/// Reads the history file at `path`. The first line is a header and is skipped
/// whatever it contains, as are blank lines.
pub fn load(path: &path::Path) -> Result<Vec<TradeRecord>> {
    let path_str = path.to_string_lossy();

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .chain_err(|| ErrorKind::FileNotFound(path_str.to_string()))?;

    let mut records = Vec::new();
    let mut raw_record = csv::StringRecord::new();

    while rdr
        .read_record(&mut raw_record)
        .chain_err(|| format!("{}: history file not well formed", path_str))?
    {
        let line = raw_record.position().map_or(0, |p| p.line());

        // Header, even when it's empty and the reader has moved past it
        if line == 1 {
            continue;
        }
        if is_blank(&raw_record) {
            warn!("{}: skipping blank line {}", path_str, line);
            continue;
        }
        if raw_record.len() != FIELDS {
            error_chain::bail!(ErrorKind::MalformedRow(
                line,
                format!("expected {} fields, found {}", FIELDS, raw_record.len())
            ));
        }
        if raw_record[0].is_empty() {
            error_chain::bail!(ErrorKind::MalformedRow(line, "empty symbol".to_owned()));
        }

        let mut record: TradeRecord = raw_record
            .deserialize(None)
            .chain_err(|| ErrorKind::MalformedRow(line, "cannot read fields".to_owned()))?;
        record.line = line;

        debug!("{}: {:?}", path_str, record);
        records.push(record);
    }

    Ok(records)
}

/// Records whose symbol contains `name_substring`, ignoring case.
pub fn matching<'a>(
    records: &'a [TradeRecord],
    name_substring: Option<&str>,
) -> impl Iterator<Item = &'a TradeRecord> {
    let s = name_substring.unwrap_or_default().to_lowercase();
    records
        .iter()
        .filter(move |r| r.symbol.to_lowercase().contains(&s))
}
