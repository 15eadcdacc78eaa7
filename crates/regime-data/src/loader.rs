//! Deterministic CSV bar loader.
//!
//! CSV format
//!
//! Required columns:
//! - `symbol`, `end_ts`, `open_micros`, `high_micros`, `low_micros`,
//!   `close_micros`, `volume`
//!
//! Optional columns:
//! - `is_complete` (bool; default: true)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::types::{Bar, Timeframe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    EmptyInput,
    MissingHeader(&'static str),
    ParseInt { column: String, value: String },
    ParseBool { column: String, value: String },
    BadRow { line: usize, reason: String },
    Io(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptyInput => write!(f, "empty input"),
            LoadError::MissingHeader(h) => write!(f, "missing header: {}", h),
            LoadError::ParseInt { column, value } => {
                write!(f, "failed to parse int in column {}: {}", column, value)
            }
            LoadError::ParseBool { column, value } => {
                write!(f, "failed to parse bool in column {}: {}", column, value)
            }
            LoadError::BadRow { line, reason } => write!(f, "bad row at line {}: {}", line, reason),
            LoadError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// Load bars from a CSV file on disk, at the given timeframe.
pub fn load_csv_file(path: impl AsRef<Path>, timeframe: Timeframe) -> Result<Vec<Bar>, LoadError> {
    let s = fs::read_to_string(path)?;
    parse_csv_bars(&s, timeframe)
}

/// Parse bars from CSV content (pure, deterministic).
pub fn parse_csv_bars(csv: &str, timeframe: Timeframe) -> Result<Vec<Bar>, LoadError> {
    let mut lines = csv.lines();

    let header_line = lines.next().ok_or(LoadError::EmptyInput)?;
    let header_line = header_line.trim().trim_start_matches('\u{feff}');
    if header_line.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let headers: Vec<String> = header_line.split(',').map(|s| s.trim().to_string()).collect();

    let mut idx: BTreeMap<String, usize> = BTreeMap::new();
    for (i, h) in headers.iter().enumerate() {
        idx.insert(h.clone(), i);
    }

    let col_symbol = find_required(&idx, "symbol")?;
    let col_end_ts = find_required(&idx, "end_ts")?;
    let col_open = find_required(&idx, "open_micros")?;
    let col_high = find_required(&idx, "high_micros")?;
    let col_low = find_required(&idx, "low_micros")?;
    let col_close = find_required(&idx, "close_micros")?;
    let col_volume = find_required(&idx, "volume")?;
    let col_is_complete = idx.get("is_complete").copied();

    let mut out: Vec<Bar> = Vec::new();

    for (line_idx0, raw) in lines.enumerate() {
        let line_no = line_idx0 + 2;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let fields: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
        let get = |col: usize| -> Result<&str, LoadError> {
            fields
                .get(col)
                .map(|s| s.as_str())
                .ok_or_else(|| LoadError::BadRow {
                    line: line_no,
                    reason: format!("missing column index {col}"),
                })
        };

        let symbol = get(col_symbol)?.trim().to_string();
        if symbol.is_empty() {
            return Err(LoadError::BadRow {
                line: line_no,
                reason: "symbol is empty".to_string(),
            });
        }

        let end_ts = parse_i64(get(col_end_ts)?, "end_ts")?;
        let open_micros = parse_i64(get(col_open)?, "open_micros")?;
        let high_micros = parse_i64(get(col_high)?, "high_micros")?;
        let low_micros = parse_i64(get(col_low)?, "low_micros")?;
        let close_micros = parse_i64(get(col_close)?, "close_micros")?;
        let volume = parse_i64(get(col_volume)?, "volume")?;

        let is_complete = match col_is_complete {
            Some(c) => parse_bool(get(c)?, "is_complete")?,
            None => true,
        };

        let bar = Bar::new(
            symbol,
            timeframe,
            end_ts,
            open_micros,
            high_micros,
            low_micros,
            close_micros,
            volume,
            is_complete,
        )
        .map_err(|e| LoadError::BadRow {
            line: line_no,
            reason: e.to_string(),
        })?;

        out.push(bar);
    }

    // Deterministic ordering: (end_ts ASC, symbol ASC)
    out.sort_by(|a, b| a.end_ts.cmp(&b.end_ts).then_with(|| a.symbol.cmp(&b.symbol)));
    Ok(out)
}

fn find_required(idx: &BTreeMap<String, usize>, name: &'static str) -> Result<usize, LoadError> {
    idx.get(name).copied().ok_or(LoadError::MissingHeader(name))
}

fn parse_i64(s: &str, col: &str) -> Result<i64, LoadError> {
    let t = s.trim();
    t.parse::<i64>().map_err(|_| LoadError::ParseInt {
        column: col.to_string(),
        value: t.to_string(),
    })
}

fn parse_bool(s: &str, col: &str) -> Result<bool, LoadError> {
    let t = s.trim();
    match t {
        "1" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(LoadError::ParseBool {
            column: col.to_string(),
            value: t.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_sorts_deterministically() {
        let csv = "symbol,end_ts,open_micros,high_micros,low_micros,close_micros,volume\n\
                    B,60,10,12,9,11,100\n\
                    A,60,20,22,19,21,200\n\
                    A,0,1,1,1,1,1\n";

        let bars = parse_csv_bars(csv, Timeframe::DAILY).expect("parse");
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "A");
        assert_eq!(bars[0].end_ts, 0);
        assert_eq!(bars[1].symbol, "A");
        assert_eq!(bars[1].end_ts, 60);
        assert_eq!(bars[2].symbol, "B");
    }

    #[test]
    fn missing_header_is_rejected() {
        let csv = "symbol,end_ts\nA,0\n";
        let err = parse_csv_bars(csv, Timeframe::DAILY).unwrap_err();
        assert_eq!(err, LoadError::MissingHeader("open_micros"));
    }
}
