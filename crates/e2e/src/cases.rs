//! Tabular case files
//!
//! A case file is CSV with a header row. Every cell is decoded in a fixed
//! order: backslash escapes first, then a single pair of matching outer
//! quotes is stripped (which pins the value to a string), and only then is
//! the text coerced to bool, integer, float or string, first match wins.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Reserved column marking a record as inactive
pub const SKIP_COLUMN: &str = "_skip_";

/// A decoded cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CaseValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl CaseValue {
    /// Decode and coerce one raw cell
    pub fn parse(raw: &str) -> Self {
        coerce(&decode_escapes(raw))
    }

    /// Truthiness used for flags: bools as-is, numbers non-zero, strings non-empty
    pub fn is_truthy(&self) -> bool {
        match self {
            CaseValue::Bool(b) => *b,
            CaseValue::Int(i) => *i != 0,
            CaseValue::Float(f) => *f != 0.0,
            CaseValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CaseValue::Str(s) if s.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CaseValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseValue::Bool(b) => write!(f, "{}", b),
            CaseValue::Int(i) => write!(f, "{}", i),
            CaseValue::Float(x) => write!(f, "{}", x),
            CaseValue::Str(s) => f.write_str(s),
        }
    }
}

/// Replace recognized backslash escapes; unknown pairs pass through untouched
pub fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Coerce already-decoded text
pub fn coerce(text: &str) -> CaseValue {
    if let Some(inner) = strip_matching_quotes(text) {
        return CaseValue::Str(inner.to_string());
    }

    if text.eq_ignore_ascii_case("true") {
        return CaseValue::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return CaseValue::Bool(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return CaseValue::Int(i);
    }
    // Integers beyond i64 keep their exact text; NaN and infinities stay text
    if !is_integer_literal(text) {
        if let Ok(f) = text.parse::<f64>() {
            if f.is_finite() {
                return CaseValue::Float(f);
            }
        }
    }

    CaseValue::Str(text.to_string())
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn strip_matching_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
    if first == last && (first == b'\'' || first == b'"') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// One row of a case file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    /// 1-based line in the source file
    pub line: u64,
    fields: HashMap<String, CaseValue>,
}

impl CaseRecord {
    pub fn new(line: u64, fields: HashMap<String, CaseValue>) -> Self {
        Self { line, fields }
    }

    pub fn get(&self, column: &str) -> Option<&CaseValue> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field rendered as text, if the column exists
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(ToString::to_string)
    }

    pub fn text_or(&self, column: &str, default: &str) -> String {
        self.text(column).unwrap_or_else(|| default.to_string())
    }

    /// Field rendered as text, treating an empty cell as absent
    pub fn non_empty_text(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    }

    pub fn require_text(&self, column: &str) -> E2eResult<String> {
        self.text(column).ok_or_else(|| E2eError::MissingField {
            line: self.line,
            field: column.to_string(),
        })
    }

    pub fn flag(&self, column: &str, default: bool) -> bool {
        self.get(column).map(CaseValue::is_truthy).unwrap_or(default)
    }

    pub fn is_skipped(&self) -> bool {
        self.flag(SKIP_COLUMN, false)
    }
}

/// All records of one case file, in file order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseFile {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub records: Vec<CaseRecord>,
}

impl CaseFile {
    /// Read and decode a case file from disk
    pub fn load(path: &Path) -> E2eResult<Self> {
        let file = std::fs::File::open(path)?;
        let cases = Self::from_reader(file, path)?;
        debug!(
            "Loaded {} case(s) from {} ({} skipped)",
            cases.len(),
            path.display(),
            cases.skipped_count()
        );
        Ok(cases)
    }

    /// Decode a case file from any reader; `origin` is only used for reporting
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> E2eResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers().map_err(ragged)?.iter().map(String::from).collect();
        if headers.is_empty() {
            return Err(E2eError::MissingHeader);
        }

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row.map_err(ragged)?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let fields = headers
                .iter()
                .zip(row.iter())
                .map(|(name, raw)| (name.clone(), CaseValue::parse(raw)))
                .collect();
            records.push(CaseRecord::new(line, fields));
        }

        Ok(Self {
            path: origin.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_skipped()).count()
    }

    /// Records not flagged with the skip column
    pub fn active(&self) -> impl Iterator<Item = &CaseRecord> {
        self.records.iter().filter(|r| !r.is_skipped())
    }
}

fn ragged(err: csv::Error) -> E2eError {
    if let csv::ErrorKind::UnequalLengths { pos, expected_len, len } = err.kind() {
        return E2eError::RaggedRow {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    E2eError::Csv(err)
}
