//! Force-plate table parser (OpenSim `.mot`-style).
//!
//! Layout: `key=value` metadata lines closed by an `endheader` line, then a
//! column-name row, then numeric rows. Plate columns are found by name, so
//! the parser accepts both OpenSim names (`1_ground_force_vx`,
//! `ground_force_px`) and lab-export names (`Fx1`, `COPx1`, `FP2_Fz`).

use std::path::Path;

use hashbrown::HashMap;

use crate::config::ParseConfig;
use crate::data::{ForceDataset, ForceFrame, ForceMetadata, ForcePlateSample, Point3D};
use crate::error::ParseError;
use crate::marker::parse_number;
use crate::source::{note_extension, FileKind};
use crate::tokenizer::{decode_text, normalize_line_endings, tokenize_normalized, Row};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Parse a force file with the default configuration.
pub fn parse_force_file(bytes: &[u8], filename: &str) -> Result<ForceDataset, ParseError> {
    parse_force_file_with_config(bytes, filename, &ParseConfig::default())
}

pub fn parse_force_file_with_config(
    bytes: &[u8],
    filename: &str,
    cfg: &ParseConfig,
) -> Result<ForceDataset, ParseError> {
    note_extension(FileKind::Forces, filename);
    let decoded = decode_text(bytes);
    let text = normalize_line_endings(&decoded);
    let lines: Vec<&str> = text.lines().collect();
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(ParseError::EmptyInput);
    }

    let (metadata, body_start) = read_metadata(&lines, cfg)?;
    let body = lines[body_start..].join("\n");
    let rows = match tokenize_normalized(&body, body_start) {
        Ok(table) => table.rows,
        Err(ParseError::EmptyInput) => {
            return Err(ParseError::UnknownColumnLayout {
                missing: vec!["column name row".into()],
            })
        }
        Err(e) => return Err(e),
    };

    let dataset = parse_force_rows(&rows, metadata)?;
    log::debug!(
        "parsed force file '{}': {} plates, {} frames",
        filename,
        dataset.plate_count(),
        dataset.frame_count()
    );
    Ok(dataset)
}

/// Read and parse a force file from disk.
pub fn parse_force_path(
    path: impl AsRef<Path>,
    cfg: &ParseConfig,
) -> Result<ForceDataset, ParseError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    parse_force_file_with_config(&bytes, &path.to_string_lossy(), cfg)
}

/// Parse the body that follows the metadata block: a column-name row then data rows.
pub fn parse_force_rows(rows: &[Row], metadata: ForceMetadata) -> Result<ForceDataset, ParseError> {
    let Some((names, data)) = rows.split_first() else {
        return Err(ParseError::UnknownColumnLayout {
            missing: vec!["column name row".into()],
        });
    };
    let expected = metadata.declared_columns;
    if names.len() != expected {
        return Err(ParseError::RowLengthMismatch {
            row: names.line,
            expected,
            actual: names.len(),
        });
    }
    let layout = ColumnLayout::resolve(&names.fields)?;

    let mut frames = Vec::with_capacity(data.len());
    for row in data {
        if row.len() != expected {
            return Err(ParseError::RowLengthMismatch {
                row: row.line,
                expected,
                actual: row.len(),
            });
        }
        frames.push(layout.read_frame(row)?);
    }

    if frames.len() != metadata.declared_rows {
        log::warn!(
            "force file declares {} rows but contains {}; using the rows present",
            metadata.declared_rows,
            frames.len()
        );
    }

    Ok(ForceDataset {
        plates: layout.plates.into_iter().map(|p| p.label).collect(),
        frames,
        metadata,
    })
}

/// Consume header lines up to the sentinel. Returns the metadata and the
/// index of the first body line.
fn read_metadata(lines: &[&str], cfg: &ParseConfig) -> Result<(ForceMetadata, usize), ParseError> {
    let mut metadata = ForceMetadata::default();
    let mut rows: Option<(String, String)> = None;
    let mut columns: Option<(String, String)> = None;
    let mut seen_first = false;

    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if cfg.is_header_sentinel(line) {
            metadata.declared_rows = declared_count(rows, "nRows")?;
            metadata.declared_columns = declared_count(columns, "nColumns")?;
            return Ok((metadata, idx + 1));
        }

        let (key, value) = split_entry(line);
        if parse_number(key).is_some() {
            // Numeric rows before the sentinel: the header was never closed.
            return Err(ParseError::MissingHeaderSentinel);
        }
        let first = !seen_first;
        seen_first = true;
        let count = CountKey::from_key(key);
        if first && count.is_none() && !line.contains('=') {
            metadata.name = Some(line.to_string());
            continue;
        }
        let entry = Some((key.to_string(), value.to_string()));
        match count {
            Some(CountKey::Rows) => rows = entry,
            Some(CountKey::Columns) => columns = entry,
            None => metadata.extra.push((key.to_string(), value.to_string())),
        }
    }
    Err(ParseError::MissingHeaderSentinel)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CountKey {
    Rows,
    Columns,
}

impl CountKey {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "nrows" | "datarows" => Some(Self::Rows),
            "ncolumns" | "datacolumns" => Some(Self::Columns),
            _ => None,
        }
    }
}

/// `key=value`, `key value` or `key<TAB>value`.
fn split_entry(line: &str) -> (&str, &str) {
    if let Some((k, v)) = line.split_once('=') {
        return (k.trim(), v.trim());
    }
    match line.split_once(char::is_whitespace) {
        Some((k, v)) => (k.trim(), v.trim()),
        None => (line, ""),
    }
}

fn declared_count(entry: Option<(String, String)>, default_key: &str) -> Result<usize, ParseError> {
    let (key, value) = entry.unwrap_or_else(|| (default_key.to_string(), String::new()));
    value
        .parse::<usize>()
        .map_err(|_| ParseError::MetadataField { key, value })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Quantity {
    Point,
    Force,
}

/// Where one name-matched column belongs.
#[derive(Debug, PartialEq, Eq)]
enum ColumnRole {
    Time,
    Plate {
        key: String,
        quantity: Quantity,
        axis: usize,
    },
}

fn axis_index(c: char) -> Option<usize> {
    AXES.iter().position(|a| *a == c)
}

fn classify(name: &str) -> Option<ColumnRole> {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "time" {
        return Some(ColumnRole::Time);
    }

    // OpenSim: <plate>_v{xyz} / <plate>_p{xyz}
    if let Some((prefix, tail)) = lower.rsplit_once('_') {
        let mut chars = tail.chars();
        if let (Some(q), Some(a), None) = (chars.next(), chars.next(), chars.next()) {
            let quantity = match q {
                'v' => Some(Quantity::Force),
                'p' => Some(Quantity::Point),
                _ => None,
            };
            if let (Some(quantity), Some(axis)) = (quantity, axis_index(a)) {
                return Some(ColumnRole::Plate {
                    key: prefix.to_string(),
                    quantity,
                    axis,
                });
            }
        }
    }

    // Lab export: [prefix]F{xyz}[n] / [prefix]COP{xyz}[n]
    let stem = lower.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = &lower[stem.len()..];
    let axis = stem.chars().last().and_then(axis_index)?;
    let base = stem[..stem.len() - 1].trim_end_matches('_');
    let (prefix, quantity) = if let Some(p) = base.strip_suffix("cop") {
        (p, Quantity::Point)
    } else if let Some(p) = base.strip_suffix('f') {
        (p, Quantity::Force)
    } else {
        return None;
    };
    let prefix = prefix.trim_end_matches('_');
    Some(ColumnRole::Plate {
        key: format!("{prefix}{number}"),
        quantity,
        axis,
    })
}

#[derive(Debug)]
struct PlateColumns {
    label: String,
    point: [usize; 3],
    force: [usize; 3],
}

/// Column indices for the time and every plate's six components.
#[derive(Debug)]
struct ColumnLayout {
    time: Option<usize>,
    plates: Vec<PlateColumns>,
}

impl ColumnLayout {
    fn resolve(names: &[String]) -> Result<Self, ParseError> {
        type Partial = (String, [Option<usize>; 3], [Option<usize>; 3]);
        let mut time = None;
        let mut order: Vec<Partial> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for (col, name) in names.iter().enumerate() {
            match classify(name) {
                Some(ColumnRole::Time) => {
                    time.get_or_insert(col);
                }
                Some(ColumnRole::Plate {
                    key,
                    quantity,
                    axis,
                }) => {
                    let idx = *by_key.entry(key.clone()).or_insert_with(|| {
                        order.push((key, [None; 3], [None; 3]));
                        order.len() - 1
                    });
                    let slot = match quantity {
                        Quantity::Point => &mut order[idx].1[axis],
                        Quantity::Force => &mut order[idx].2[axis],
                    };
                    if slot.is_some() {
                        log::warn!("duplicate force column '{name}' ignored");
                    } else {
                        *slot = Some(col);
                    }
                }
                None => {}
            }
        }

        if order.is_empty() {
            return Err(ParseError::UnknownColumnLayout {
                missing: vec!["force plate columns".into()],
            });
        }

        let mut missing = Vec::new();
        let mut plates = Vec::with_capacity(order.len());
        for (n, (key, point, force)) in order.into_iter().enumerate() {
            let label = if key.is_empty() {
                (n + 1).to_string()
            } else {
                key
            };
            for (quantity, cols) in [("point", &point), ("force", &force)] {
                for (axis, col) in AXES.iter().zip(cols.iter()) {
                    if col.is_none() {
                        missing.push(format!("plate '{label}' {quantity} {axis}"));
                    }
                }
            }
            if let (Some(point), Some(force)) = (complete(point), complete(force)) {
                plates.push(PlateColumns {
                    label,
                    point,
                    force,
                });
            }
        }
        if !missing.is_empty() {
            return Err(ParseError::UnknownColumnLayout { missing });
        }
        Ok(Self { time, plates })
    }

    fn read_frame(&self, row: &Row) -> Result<ForceFrame, ParseError> {
        let time = match self.time {
            Some(col) => Some(parse_number(row.field(col)).ok_or_else(|| {
                ParseError::NumericField {
                    row: row.line,
                    column: col + 1,
                    value: row.field(col).to_string(),
                }
            })?),
            None => None,
        };
        let plates = self
            .plates
            .iter()
            .map(|p| ForcePlateSample {
                point: read_vector(row, &p.point),
                force: read_vector(row, &p.force),
            })
            .collect();
        Ok(ForceFrame { time, plates })
    }
}

fn complete(cols: [Option<usize>; 3]) -> Option<[usize; 3]> {
    Some([cols[0]?, cols[1]?, cols[2]?])
}

fn read_vector(row: &Row, cols: &[usize; 3]) -> Option<Point3D> {
    let c = |i: usize| parse_number(row.field(cols[i]));
    Some(Point3D::new(c(0)?, c(1)?, c(2)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plate(key: &str, quantity: Quantity, axis: usize) -> Option<ColumnRole> {
        Some(ColumnRole::Plate {
            key: key.into(),
            quantity,
            axis,
        })
    }

    #[test]
    fn classifies_opensim_names() {
        assert_eq!(classify("time"), Some(ColumnRole::Time));
        assert_eq!(
            classify("ground_force_vx"),
            plate("ground_force", Quantity::Force, 0)
        );
        assert_eq!(
            classify("1_ground_force_PZ"),
            plate("1_ground_force", Quantity::Point, 2)
        );
        assert_eq!(classify("ground_torque_x"), None);
    }

    #[test]
    fn classifies_lab_export_names() {
        assert_eq!(classify("Fx1"), plate("1", Quantity::Force, 0));
        assert_eq!(classify("COPy2"), plate("2", Quantity::Point, 1));
        assert_eq!(classify("FP1_Fz"), plate("fp1", Quantity::Force, 2));
        assert_eq!(classify("FP1_COP_x"), plate("fp1", Quantity::Point, 0));
        assert_eq!(classify("Mx1"), None);
    }

    #[test]
    fn split_entry_forms() {
        assert_eq!(split_entry("nRows=10"), ("nRows", "10"));
        assert_eq!(split_entry("datarows 10"), ("datarows", "10"));
        assert_eq!(split_entry("nColumns\t19"), ("nColumns", "19"));
        assert_eq!(split_entry("inDegrees"), ("inDegrees", ""));
    }

    #[test]
    fn layout_reports_every_missing_component() {
        let names: Vec<String> = ["time", "Fx1", "Fy1", "Fz1", "COPx1", "COPy1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = ColumnLayout::resolve(&names).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownColumnLayout {
                missing: vec!["plate '1' point z".into()]
            }
        );
    }

    #[test]
    fn metadata_requires_counts() {
        let cfg = ParseConfig::default();
        let lines = ["trial.mot", "version=1", "nRows=abc", "nColumns=7", "endheader"];
        let err = read_metadata(&lines, &cfg).unwrap_err();
        assert_eq!(
            err,
            ParseError::MetadataField {
                key: "nRows".into(),
                value: "abc".into()
            }
        );

        let lines = ["nColumns=7", "endheader"];
        assert!(matches!(
            read_metadata(&lines, &cfg),
            Err(ParseError::MetadataField { .. })
        ));
    }

    #[test]
    fn count_line_is_never_taken_as_the_name() {
        let cfg = ParseConfig::default();
        let lines = ["datacolumns 7", "datarows 1", "endheader"];
        let (metadata, body_start) = read_metadata(&lines, &cfg).unwrap();
        assert_eq!(metadata.name, None);
        assert_eq!(metadata.declared_columns, 7);
        assert_eq!(metadata.declared_rows, 1);
        assert_eq!(body_start, 3);
    }

    #[test]
    fn data_before_sentinel_is_rejected() {
        let cfg = ParseConfig::default();
        let lines = ["trial.mot", "nRows=1", "nColumns=7", "0.0\t1\t2"];
        assert_eq!(
            read_metadata(&lines, &cfg),
            Err(ParseError::MissingHeaderSentinel)
        );
    }
}
