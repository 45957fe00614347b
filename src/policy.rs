use std::convert::TryFrom;
use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate};
use itertools::Itertools;

/// Kind code of a buy trade. Every other code is a sell.
pub const BUY_KIND: &str = "C";

const FORMAT_IN: &str = "%d/%m/%Y";
const FORMAT_OUT: &str = "%Y-%m-%d %H:%M:%S";

/// How the kind column becomes the command token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindPolicy {
    /// `C` becomes `buy`, anything else `sell`
    Map,
    /// The kind code is the command token
    Raw,
}

/// How the date column is rewritten for the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicy {
    /// Date token goes through untouched
    Raw,
    /// `DD/MM/YYYY` becomes `YYYY-MM-DD HH:MM:SS`, at midnight plus one second per row
    Timestamp,
    /// `DD/MM/YYYY` becomes `YYYY-MM-DD`
    Reverse,
}

impl KindPolicy {
    pub fn command<'a>(&self, kind: &'a str) -> &'a str {
        match self {
            KindPolicy::Map if kind == BUY_KIND => "buy",
            KindPolicy::Map => "sell",
            KindPolicy::Raw => kind,
        }
    }
}

impl DatePolicy {
    /// Returns `None` when the policy needs a `DD/MM/YYYY` date and `date` isn't one.
    pub fn format(&self, date: &str, index: usize) -> Option<String> {
        match self {
            DatePolicy::Raw => Some(date.to_owned()),
            DatePolicy::Timestamp => {
                day_month_year(date)?;
                timestamp(date, index)
            }
            DatePolicy::Reverse => {
                day_month_year(date)?;
                Some(reverse_components(date, '/', '-'))
            }
        }
    }
}

/// Splits a `DD/MM/YYYY` token, accepting single digit days and months.
pub fn day_month_year(date: &str) -> Option<(&str, &str, &str)> {
    let (d, m, y) = date.split('/').collect_tuple()?;
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };

    if digits(d, 1, 2) && digits(m, 1, 2) && digits(y, 4, 4) {
        Some((d, m, y))
    } else {
        None
    }
}

/// Midnight of `date` plus `index` seconds. Rolls into the next day past 86399.
pub fn timestamp(date: &str, index: usize) -> Option<String> {
    let day = NaiveDate::parse_from_str(date, FORMAT_IN).ok()?;
    let offset = Duration::seconds(i64::try_from(index).ok()?);
    let ts = day.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)?;

    Some(ts.format(FORMAT_OUT).to_string())
}

pub fn reverse_components(token: &str, from: char, to: char) -> String {
    token.split(from).rev().join(&to.to_string())
}

impl FromStr for KindPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map" => Ok(KindPolicy::Map),
            "raw" => Ok(KindPolicy::Raw),
            _ => Err(format!("unknown kind policy '{}' (expected map or raw)", s)),
        }
    }
}

impl FromStr for DatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(DatePolicy::Raw),
            "timestamp" => Ok(DatePolicy::Timestamp),
            "reverse" => Ok(DatePolicy::Reverse),
            _ => Err(format!(
                "unknown date policy '{}' (expected raw, timestamp or reverse)",
                s
            )),
        }
    }
}

impl fmt::Display for KindPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                KindPolicy::Map => "map",
                KindPolicy::Raw => "raw",
            }
        )
    }
}

impl fmt::Display for DatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DatePolicy::Raw => "raw",
                DatePolicy::Timestamp => "timestamp",
                DatePolicy::Reverse => "reverse",
            }
        )
    }
}
