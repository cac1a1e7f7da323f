//! Canonical in-memory datasets produced by the parsers.
//!
//! Datasets are built wholesale by a single parse call and never mutated
//! afterwards; a newer parse replaces the whole value.

use serde::{Deserialize, Serialize};

/// A sampled 3D coordinate in the lab frame of the exporting system.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A tracked reflective point, identified by its column label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Marker {
    pub label: String,
}

impl Marker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// One sample row of a marker file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarkerFrame {
    /// Sample time in seconds.
    pub time: f64,
    /// One entry per marker, in marker order. `None` means no usable sample.
    pub positions: Vec<Option<Point3D>>,
}

/// Marker labels plus every parsed frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MarkerDataset {
    pub markers: Vec<Marker>,
    pub frames: Vec<MarkerFrame>,
}

impl MarkerDataset {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&MarkerFrame> {
        self.frames.get(index)
    }

    pub fn marker_index(&self, label: &str) -> Option<usize> {
        self.markers.iter().position(|m| m.label == label)
    }

    /// Position of `marker` at `frame`; `None` if either is out of range or
    /// the sample is missing.
    pub fn position(&self, frame: usize, marker: usize) -> Option<Point3D> {
        self.frames
            .get(frame)
            .and_then(|f| f.positions.get(marker).copied().flatten())
    }

    pub fn time_of(&self, frame: usize) -> Option<f64> {
        self.frames.get(frame).map(|f| f.time)
    }

    /// Seconds between the first two samples.
    pub fn sample_interval(&self) -> Option<f64> {
        match self.frames.as_slice() {
            [first, second, ..] => Some(second.time - first.time),
            _ => None,
        }
    }

    /// Check the structural invariants the parser guarantees.
    pub fn validate_basic(&self) -> Result<(), String> {
        let n = self.markers.len();
        let mut last = f64::NEG_INFINITY;
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.positions.len() != n {
                return Err(format!(
                    "frame {i} has {} positions for {n} markers",
                    frame.positions.len()
                ));
            }
            if !frame.time.is_finite() || frame.time < last {
                return Err(format!("frame {i} time {} is not non-decreasing", frame.time));
            }
            last = frame.time;
        }
        Ok(())
    }
}

/// What one force plate reported for one sample.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ForcePlateSample {
    /// Center of pressure; `None` when unreadable.
    pub point: Option<Point3D>,
    /// Ground reaction force; `None` when unreadable.
    pub force: Option<Point3D>,
}

impl ForcePlateSample {
    /// False when the plate reports no load (missing or zero force).
    #[inline]
    pub fn in_contact(&self) -> bool {
        self.force.is_some_and(|f| !f.is_zero())
    }
}

/// One sample row of a force file: one entry per plate, in plate order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ForceFrame {
    #[serde(default)]
    pub time: Option<f64>,
    pub plates: Vec<ForcePlateSample>,
}

/// Header values read from a force file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ForceMetadata {
    /// Bare first line of the header, when present (usually the file name).
    #[serde(default)]
    pub name: Option<String>,
    pub declared_rows: usize,
    pub declared_columns: usize,
    /// Remaining `key=value` pairs in file order.
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

/// Parsed force-plate data, index-aligned with marker frames by intent.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ForceDataset {
    /// Plate identifiers derived from the column names, in plate order.
    pub plates: Vec<String>,
    pub frames: Vec<ForceFrame>,
    #[serde(default)]
    pub metadata: ForceMetadata,
}

impl ForceDataset {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn plate_count(&self) -> usize {
        self.plates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Force frame paired with the marker frame at the same index, if the
    /// force recording is long enough.
    pub fn frame_for(&self, marker_frame: usize) -> Option<&ForceFrame> {
        self.frames.get(marker_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_frame_dataset() -> MarkerDataset {
        MarkerDataset {
            markers: vec![Marker::new("LASIS"), Marker::new("LKJC")],
            frames: vec![
                MarkerFrame {
                    time: 0.0,
                    positions: vec![Some(Point3D::new(0.07, -1.31, 0.92)), None],
                },
                MarkerFrame {
                    time: 0.01,
                    positions: vec![
                        Some(Point3D::new(0.08, -1.30, 0.93)),
                        Some(Point3D::new(0.10, -1.47, 0.48)),
                    ],
                },
            ],
        }
    }

    #[test]
    fn lookup_helpers() {
        let ds = two_frame_dataset();
        assert_eq!(ds.marker_index("LKJC"), Some(1));
        assert_eq!(ds.marker_index("nope"), None);
        assert_eq!(ds.position(0, 1), None);
        assert_eq!(ds.position(1, 1), Some(Point3D::new(0.10, -1.47, 0.48)));
        assert_eq!(ds.position(5, 0), None);
        assert_eq!(ds.time_of(1), Some(0.01));
        assert_eq!(ds.sample_interval(), Some(0.01));
        assert!(ds.validate_basic().is_ok());
    }

    #[test]
    fn validate_catches_ragged_frames() {
        let mut ds = two_frame_dataset();
        ds.frames[1].positions.pop();
        assert!(ds.validate_basic().is_err());
    }

    #[test]
    fn contact_requires_nonzero_force() {
        let none = ForcePlateSample::default();
        assert!(!none.in_contact());
        let zero = ForcePlateSample {
            point: Some(Point3D::default()),
            force: Some(Point3D::default()),
        };
        assert!(!zero.in_contact());
        let loaded = ForcePlateSample {
            point: None,
            force: Some(Point3D::new(0.0, 700.0, 0.0)),
        };
        assert!(loaded.in_contact());
    }

    #[test]
    fn short_force_dataset_is_not_an_error() {
        let ds = ForceDataset {
            plates: vec!["1".into()],
            frames: vec![ForceFrame::default()],
            metadata: ForceMetadata::default(),
        };
        assert!(ds.frame_for(0).is_some());
        assert!(ds.frame_for(10).is_none());
    }
}
