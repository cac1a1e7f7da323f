//! Marker-trajectory table parser.
//!
//! Expected shape: header rows (title lines, a marker label row, optionally an
//! X/Y/Z axis-tag row) followed by one data row per sample. The first column
//! of a data row is the sample time in seconds, then one X,Y,Z triplet per
//! marker in label order.

use std::path::Path;

use hashbrown::HashMap;

use crate::config::ParseConfig;
use crate::data::{Marker, MarkerDataset, MarkerFrame, Point3D};
use crate::error::ParseError;
use crate::source::{note_extension, FileKind};
use crate::tokenizer::{decode_text, tokenize, Row};

/// Parse a marker file with the default configuration.
pub fn parse_marker_file(bytes: &[u8], filename: &str) -> Result<MarkerDataset, ParseError> {
    parse_marker_file_with_config(bytes, filename, &ParseConfig::default())
}

pub fn parse_marker_file_with_config(
    bytes: &[u8],
    filename: &str,
    cfg: &ParseConfig,
) -> Result<MarkerDataset, ParseError> {
    note_extension(FileKind::Markers, filename);
    let text = decode_text(bytes);
    let table = tokenize(&text)?;
    let dataset = parse_marker_rows(&table.rows, cfg)?;
    log::debug!(
        "parsed marker file '{}': {} markers, {} frames",
        filename,
        dataset.marker_count(),
        dataset.frame_count()
    );
    Ok(dataset)
}

/// Read and parse a marker file from disk.
pub fn parse_marker_path(
    path: impl AsRef<Path>,
    cfg: &ParseConfig,
) -> Result<MarkerDataset, ParseError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    parse_marker_file_with_config(&bytes, &path.to_string_lossy(), cfg)
}

/// Parse already-tokenized rows into a dataset.
pub fn parse_marker_rows(rows: &[Row], cfg: &ParseConfig) -> Result<MarkerDataset, ParseError> {
    let data_start = rows
        .iter()
        .position(|r| parse_number(r.field(0)).is_some())
        .unwrap_or(rows.len());
    let header = MarkerHeader::from_rows(&rows[..data_start], rows.first())?;
    let width = header.width();

    let mut frames = Vec::with_capacity(rows.len() - data_start);
    let mut last_time: Option<f64> = None;
    for row in &rows[data_start..] {
        if row.len() != width {
            return Err(ParseError::RowLengthMismatch {
                row: row.line,
                expected: width,
                actual: row.len(),
            });
        }
        let time = parse_number(row.field(0)).ok_or_else(|| ParseError::NumericField {
            row: row.line,
            column: 1,
            value: row.field(0).to_string(),
        })?;
        if let Some(previous) = last_time {
            if time < previous {
                return Err(ParseError::NonMonotonicTime {
                    row: row.line,
                    previous,
                    time,
                });
            }
        }
        last_time = Some(time);

        let positions = (0..header.labels.len())
            .map(|m| read_triplet(row, 1 + 3 * m, cfg))
            .collect();
        frames.push(MarkerFrame { time, positions });
    }

    Ok(MarkerDataset {
        markers: header.labels.into_iter().map(Marker::new).collect(),
        frames,
    })
}

/// Marker labels recovered from the header block.
#[derive(Debug)]
struct MarkerHeader {
    labels: Vec<String>,
}

impl MarkerHeader {
    fn from_rows(header: &[Row], first: Option<&Row>) -> Result<Self, ParseError> {
        let label_row = header
            .iter()
            .rev()
            .find(|r| !is_axis_row(r) && r.fields.iter().skip(1).any(|f| !f.is_empty()))
            .ok_or_else(|| ParseError::HeaderShape {
                row: first.map_or(1, |r| r.line),
                reason: "no marker label row before the first data row".into(),
            })?;

        let region = &label_row.fields[1..];
        let labels = if let Some(labels) = repeated_triplet_labels(region) {
            labels
        } else if region.iter().all(|f| !f.is_empty()) {
            // Compact layout: one label per triplet with no padding cells.
            region.to_vec()
        } else {
            aligned_labels(label_row)?
        };
        Ok(Self {
            labels: dedup_labels(labels),
        })
    }

    #[inline]
    fn width(&self) -> usize {
        1 + 3 * self.labels.len()
    }
}

fn aligned_labels(row: &Row) -> Result<Vec<String>, ParseError> {
    let region = &row.fields[1..];
    if region.len() % 3 != 0 {
        return Err(ParseError::HeaderShape {
            row: row.line,
            reason: format!(
                "{} columns after the time column do not divide into X,Y,Z triplets",
                region.len()
            ),
        });
    }
    let mut labels = Vec::with_capacity(region.len() / 3);
    for (i, triplet) in region.chunks(3).enumerate() {
        let column = 2 + 3 * i;
        if triplet[0].is_empty() {
            return Err(ParseError::HeaderShape {
                row: row.line,
                reason: format!("triplet starting at column {column} has no marker label"),
            });
        }
        if let Some(stray) = triplet[1..].iter().find(|f| !f.is_empty()) {
            return Err(ParseError::HeaderShape {
                row: row.line,
                reason: format!(
                    "label '{stray}' inside the triplet of '{}' (column {column})",
                    triplet[0]
                ),
            });
        }
        labels.push(triplet[0].clone());
    }
    Ok(labels)
}

/// Layout that writes each label over all three of its columns
/// (`A,A,A,B,B,B`). Collapses each triplet to one label.
fn repeated_triplet_labels(region: &[String]) -> Option<Vec<String>> {
    if region.is_empty() || region.len() % 3 != 0 {
        return None;
    }
    region
        .chunks(3)
        .map(|t| (!t[0].is_empty() && t[1] == t[0] && t[2] == t[0]).then(|| t[0].clone()))
        .collect()
}

/// Labels are lookup keys, so repeats get a `#n` suffix.
fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(labels.len());
    labels
        .into_iter()
        .map(|label| {
            let count = seen.entry(label.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                label
            } else {
                let renamed = format!("{label}#{count}");
                log::warn!("duplicate marker label '{label}' renamed to '{renamed}'");
                renamed
            }
        })
        .collect()
}

/// `X`, `y2`, `Z10`...
fn is_axis_tag(field: &str) -> bool {
    let mut chars = field.chars();
    matches!(chars.next(), Some('X' | 'Y' | 'Z' | 'x' | 'y' | 'z'))
        && chars.all(|c| c.is_ascii_digit())
}

fn is_axis_row(row: &Row) -> bool {
    let mut tags = row.fields.iter().skip(1).filter(|f| !f.is_empty()).peekable();
    tags.peek().is_some() && tags.all(|f| is_axis_tag(f))
}

#[inline]
pub(crate) fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A triplet is a real position only if all three components are.
fn read_triplet(row: &Row, column: usize, cfg: &ParseConfig) -> Option<Point3D> {
    let component = |offset: usize| {
        let field = row.field(column + offset);
        if field.is_empty() || cfg.is_missing_sentinel(field) {
            None
        } else {
            parse_number(field)
        }
    };
    Some(Point3D::new(component(0)?, component(1)?, component(2)?))
}
