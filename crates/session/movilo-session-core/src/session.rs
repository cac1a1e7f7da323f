//! The application-side owner of the marker and force datasets and the
//! playback timeline.
//!
//! Loads can run in the background (`request_*` then `poll`) or inline
//! (`load_*_now`); both go through the same generation check, so whichever
//! request was issued last decides what the session ends up holding.

use std::path::Path;
use std::time::{Duration, Instant};

use movilo_mocap_core::{
    FileKind, ForceDataset, ForceFrame, MarkerDataset, MarkerFrame, ParseConfig, ParseError,
};
use movilo_playback_core::{
    TickReport, Timeline, TimelineCommand, TimelineConfig, TimelineEvent, TimelineSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::slot::{DatasetSlot, Publish};
use crate::worker::{parse_kind, ParseOutcome, ParseWorker, ParsedDataset};

/// Aggregate configuration, loadable from JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub parse: ParseConfig,
    pub timeline: TimelineConfig,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| SessionError::Config {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }
}

/// What happened to one load request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    Loaded {
        kind: FileKind,
        file_name: String,
    },
    Failed {
        kind: FileKind,
        file_name: String,
        error: ParseError,
    },
    Superseded {
        kind: FileKind,
        generation: u64,
    },
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    markers: DatasetSlot<MarkerDataset>,
    forces: DatasetSlot<ForceDataset>,
    timeline: Timeline,
    worker: ParseWorker,
    last_error: Option<ParseError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            markers: DatasetSlot::new(),
            forces: DatasetSlot::new(),
            timeline: Timeline::new(config.timeline.clone()),
            worker: ParseWorker::new(config.parse.clone()),
            last_error: None,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- loading ---

    /// Start parsing a file in the background. Supersedes any earlier
    /// request for the same kind. Returns the request's generation.
    pub fn request(
        &mut self,
        kind: FileKind,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<u64, SessionError> {
        let file_name = file_name.into();
        let (generation, latest) = match kind {
            FileKind::Markers => (self.markers.request(), self.markers.generation()),
            FileKind::Forces => (self.forces.request(), self.forces.generation()),
        };
        log::debug!(
            "requested {} parse of '{}' (generation {generation})",
            kind.name(),
            file_name
        );
        if let Err(err) = self.worker.spawn(kind, generation, latest, file_name, bytes) {
            self.abandon(kind, generation);
            return Err(err);
        }
        Ok(generation)
    }

    fn abandon(&mut self, kind: FileKind, generation: u64) {
        log::warn!("{} request {generation} abandoned: worker did not start", kind.name());
        match kind {
            FileKind::Markers => self.markers.abandon(generation),
            FileKind::Forces => self.forces.abandon(generation),
        }
    }

    pub fn request_markers(
        &mut self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<u64, SessionError> {
        self.request(FileKind::Markers, file_name, bytes)
    }

    pub fn request_forces(
        &mut self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<u64, SessionError> {
        self.request(FileKind::Forces, file_name, bytes)
    }

    /// Parse inline and publish. Supersedes any background request for the
    /// same kind that is still running.
    pub fn load_now(&mut self, kind: FileKind, file_name: &str, bytes: &[u8]) -> SessionEvent {
        let generation = match kind {
            FileKind::Markers => self.markers.request(),
            FileKind::Forces => self.forces.request(),
        };
        let result = parse_kind(kind, bytes, file_name, self.worker.config());
        self.publish(ParseOutcome {
            kind,
            generation,
            file_name: file_name.to_string(),
            result,
        })
    }

    pub fn load_markers_now(&mut self, file_name: &str, bytes: &[u8]) -> SessionEvent {
        self.load_now(FileKind::Markers, file_name, bytes)
    }

    pub fn load_forces_now(&mut self, file_name: &str, bytes: &[u8]) -> SessionEvent {
        self.load_now(FileKind::Forces, file_name, bytes)
    }

    /// Apply every background result that has arrived so far.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(outcome) = self.worker.try_recv() {
            events.push(self.publish(outcome));
        }
        events
    }

    /// Block until no request is pending or `timeout` elapses, applying
    /// results as they arrive.
    pub fn wait(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.poll();
        while self.is_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Some(outcome) = self.worker.recv_timeout(remaining) {
                events.push(self.publish(outcome));
            }
        }
        events
    }

    /// Whether any request still awaits its result.
    pub fn is_pending(&self) -> bool {
        self.markers.is_pending() || self.forces.is_pending()
    }

    fn publish(&mut self, outcome: ParseOutcome) -> SessionEvent {
        let ParseOutcome {
            kind,
            generation,
            file_name,
            result,
        } = outcome;

        let published = match (kind, result) {
            (FileKind::Markers, Ok(ParsedDataset::Markers(ds))) => {
                self.markers.publish(generation, &file_name, Ok(ds))
            }
            (FileKind::Forces, Ok(ParsedDataset::Forces(ds))) => {
                self.forces.publish(generation, &file_name, Ok(ds))
            }
            (FileKind::Markers, Err(err)) => self.markers.publish(generation, &file_name, Err(err)),
            (FileKind::Forces, Err(err)) => self.forces.publish(generation, &file_name, Err(err)),
            (FileKind::Markers, Ok(ParsedDataset::Forces(_)))
            | (FileKind::Forces, Ok(ParsedDataset::Markers(_))) => {
                log::warn!("discarding {} result with mismatched dataset", kind.name());
                return SessionEvent::Superseded { kind, generation };
            }
        };

        match published {
            Publish::Applied => {
                if kind == FileKind::Markers {
                    if let Some(ds) = self.markers.dataset() {
                        self.timeline.load(ds);
                    }
                }
                self.last_error = None;
                log::debug!("loaded {} file '{}'", kind.name(), file_name);
                SessionEvent::Loaded { kind, file_name }
            }
            Publish::Rejected(error) => {
                log::warn!("failed to load {} file '{}': {error}", kind.name(), file_name);
                self.last_error = Some(error.clone());
                SessionEvent::Failed {
                    kind,
                    file_name,
                    error,
                }
            }
            Publish::Superseded => {
                log::debug!(
                    "ignoring superseded {} result for '{}' (generation {generation})",
                    kind.name(),
                    file_name
                );
                SessionEvent::Superseded { kind, generation }
            }
        }
    }

    // --- state ---

    pub fn markers(&self) -> Option<&MarkerDataset> {
        self.markers.dataset()
    }

    pub fn forces(&self) -> Option<&ForceDataset> {
        self.forces.dataset()
    }

    /// File name to display for a slot; `None` while its last load failed.
    pub fn file_name(&self, kind: FileKind) -> Option<&str> {
        match kind {
            FileKind::Markers => self.markers.file_name(),
            FileKind::Forces => self.forces.file_name(),
        }
    }

    pub fn has_error(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Markers => self.markers.has_error(),
            FileKind::Forces => self.forces.has_error(),
        }
    }

    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    /// Acknowledge the last error (the popup was closed). Slot flags are
    /// cleared too, so file names show again.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
        self.markers.clear_error();
        self.forces.clear_error();
    }

    // --- playback ---

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn apply(&mut self, cmd: TimelineCommand) -> bool {
        self.timeline.apply(cmd)
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> TickReport {
        self.timeline.tick(timestamp_ms)
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        self.timeline.snapshot()
    }

    pub fn drain_timeline_events(&mut self) -> Vec<TimelineEvent> {
        self.timeline.drain_events()
    }

    /// Marker frame at the timeline's current position.
    pub fn current_marker_frame(&self) -> Option<&MarkerFrame> {
        self.markers()?.frame(self.timeline.current_frame())
    }

    /// Force frame aligned with the current marker frame, if the force
    /// recording is long enough.
    pub fn current_force_frame(&self) -> Option<&ForceFrame> {
        self.forces()?.frame_for(self.timeline.current_frame())
    }
}
