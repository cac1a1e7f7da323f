//! Delimiter-aware row reader shared by both parsers.
//!
//! The delimiter is inferred once per file from the first non-blank line:
//! tab, then comma, then runs of whitespace. Tab and comma tables go through
//! the `csv` reader with flexible record lengths; whitespace tables are split
//! by hand because `csv` only knows single-byte delimiters.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Whitespace,
}

impl Delimiter {
    /// Pick the dialect a single line suggests.
    pub fn infer(line: &str) -> Self {
        if line.contains('\t') {
            Self::Tab
        } else if line.contains(',') {
            Self::Comma
        } else {
            Self::Whitespace
        }
    }

    fn byte(&self) -> Option<u8> {
        match self {
            Self::Tab => Some(b'\t'),
            Self::Comma => Some(b','),
            Self::Whitespace => None,
        }
    }
}

/// One non-blank input line split into trimmed fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source text.
    pub line: usize,
    pub fields: Vec<String>,
}

impl Row {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field text, or `""` past the end of the row.
    #[inline]
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// True when every field is empty (a delimiter-only placeholder line).
    pub fn all_empty(&self) -> bool {
        self.fields.iter().all(|f| f.is_empty())
    }
}

/// Tokenized file: the dialect that was detected and every kept row.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub delimiter: Delimiter,
    pub rows: Vec<Row>,
}

/// Decode raw bytes as UTF-8 (lossy), dropping a byte-order mark.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Rewrite `\r\n` and lone `\r` as `\n`.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split raw text into rows, inferring the delimiter from the first non-blank line.
pub fn tokenize(text: &str) -> Result<Table, ParseError> {
    let text = normalize_line_endings(text);
    tokenize_normalized(&text, 0)
}

/// Tokenize text whose line endings are already `\n`. Reported line numbers
/// are shifted by `line_offset`, for bodies cut out of a larger file.
pub(crate) fn tokenize_normalized(text: &str, line_offset: usize) -> Result<Table, ParseError> {
    let first = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or(ParseError::EmptyInput)?;
    let delimiter = Delimiter::infer(first);
    log::debug!("detected {:?} delimiter", delimiter);

    let rows = match delimiter.byte() {
        Some(byte) => read_delimited(text, byte, line_offset)?,
        None => read_whitespace(text, line_offset),
    };
    if rows.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    Ok(Table { delimiter, rows })
}

fn read_delimited(text: &str, delimiter: u8, line_offset: usize) -> Result<Vec<Row>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(delimiter == b',')
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ParseError::Tokenize {
            row: e.position().map_or(0, |p| p.line() as usize) + line_offset,
            reason: e.to_string(),
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize) + line_offset;
        let row = Row::new(line, record.iter().map(str::to_string).collect());
        // Whitespace-only lines come back as a single empty field.
        if row.len() == 1 && row.all_empty() {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn read_whitespace(text: &str, line_offset: usize) -> Vec<Row> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            (!fields.is_empty()).then(|| Row::new(idx + 1 + line_offset, fields))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_tab_before_comma() {
        assert_eq!(Delimiter::infer("a\tb,c"), Delimiter::Tab);
        assert_eq!(Delimiter::infer("a,b c"), Delimiter::Comma);
        assert_eq!(Delimiter::infer("a  b c"), Delimiter::Whitespace);
    }

    #[test]
    fn tab_rows_keep_empty_placeholders() {
        let table = tokenize("Time\tA\t\t\n0.0\t1\t2\t3\n\t\t\t\n\n\n").unwrap();
        assert_eq!(table.delimiter, Delimiter::Tab);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].fields, vec!["Time", "A", "", ""]);
        assert_eq!(table.rows[2].fields, vec!["", "", "", ""]);
        assert_eq!(table.rows[2].line, 3);
        assert!(table.rows[2].all_empty());
    }

    #[test]
    fn crlf_and_cr_are_normalized() {
        let table = tokenize("a,b\r\n1, 2\r3 ,4\r\n").unwrap();
        assert_eq!(table.delimiter, Delimiter::Comma);
        let fields: Vec<_> = table.rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(
            fields,
            vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]
        );
        assert_eq!(table.rows[2].line, 3);
    }

    #[test]
    fn whitespace_runs_collapse() {
        let table = tokenize("\n\nTime   A  B\n 0.1  1 2 3   4 5 6 \n").unwrap();
        assert_eq!(table.delimiter, Delimiter::Whitespace);
        assert_eq!(table.rows[0].line, 3);
        assert_eq!(table.rows[1].len(), 7);
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(tokenize(""), Err(ParseError::EmptyInput));
        assert_eq!(tokenize(" \n\t\n\r\n"), Err(ParseError::EmptyInput));
    }

    #[test]
    fn interior_blank_lines_are_skipped_but_counted() {
        let table = tokenize("a\tb\n\n   \n1\t2\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn decode_strips_bom() {
        let text = decode_text(b"\xEF\xBB\xBFTime\tA");
        assert!(text.starts_with("Time"));
    }

    #[test]
    fn field_past_end_is_empty() {
        let row = Row::new(1, vec!["x".into()]);
        assert_eq!(row.field(0), "x");
        assert_eq!(row.field(3), "");
    }
}
