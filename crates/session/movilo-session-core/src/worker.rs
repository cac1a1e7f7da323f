//! Background parsing. Each request runs on its own thread and reports back
//! over a channel that the owning session drains on its own thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use movilo_mocap_core::{
    parse_force_file_with_config, parse_marker_file_with_config, FileKind, ForceDataset,
    MarkerDataset, ParseConfig, ParseError,
};

use crate::error::SessionError;
use crate::slot::Generation;

/// A dataset of either kind, as produced by [`parse_kind`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedDataset {
    Markers(MarkerDataset),
    Forces(ForceDataset),
}

/// One finished request.
#[derive(Clone, Debug)]
pub struct ParseOutcome {
    pub kind: FileKind,
    pub generation: u64,
    pub file_name: String,
    pub result: Result<ParsedDataset, ParseError>,
}

/// Run the parser matching `kind`.
pub fn parse_kind(
    kind: FileKind,
    bytes: &[u8],
    file_name: &str,
    cfg: &ParseConfig,
) -> Result<ParsedDataset, ParseError> {
    match kind {
        FileKind::Markers => {
            parse_marker_file_with_config(bytes, file_name, cfg).map(ParsedDataset::Markers)
        }
        FileKind::Forces => {
            parse_force_file_with_config(bytes, file_name, cfg).map(ParsedDataset::Forces)
        }
    }
}

#[derive(Debug)]
pub struct ParseWorker {
    tx: Sender<ParseOutcome>,
    rx: Receiver<ParseOutcome>,
    config: ParseConfig,
}

impl ParseWorker {
    pub fn new(config: ParseConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, config }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Parse `bytes` on a new thread. The result is sent only if `latest`
    /// still reports `generation` when the parse finishes.
    pub fn spawn(
        &self,
        kind: FileKind,
        generation: u64,
        latest: Generation,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<(), SessionError> {
        let tx = self.tx.clone();
        let cfg = self.config.clone();
        thread::Builder::new()
            .name(format!("movilo-parse-{}", kind.name()))
            .spawn(move || {
                let result = parse_kind(kind, &bytes, &file_name, &cfg);
                if !latest.is_current(generation) {
                    log::debug!(
                        "dropping superseded {} parse of '{}' (generation {generation})",
                        kind.name(),
                        file_name
                    );
                    return;
                }
                // The session may already be gone; nothing to report to then.
                let _ = tx.send(ParseOutcome {
                    kind,
                    generation,
                    file_name,
                    result,
                });
            })
            .map(|_| ())
            .map_err(|err| SessionError::Worker {
                reason: err.to_string(),
            })
    }

    /// Next finished request, if any, without blocking.
    pub fn try_recv(&self) -> Option<ParseOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            // The worker holds a sender itself, so the channel never disconnects.
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next finished request.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ParseOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_request_is_delivered() {
        let worker = ParseWorker::new(ParseConfig::default());
        let latest = Generation::default();
        let generation = latest.issue();
        worker
            .spawn(
                FileKind::Markers,
                generation,
                latest,
                "a.tsv".into(),
                b"Time\tA\t\t\n0.0\t1\t2\t3\n".to_vec(),
            )
            .unwrap();

        let outcome = worker.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.kind, FileKind::Markers);
        assert!(matches!(outcome.result, Ok(ParsedDataset::Markers(_))));
    }

    #[test]
    fn superseded_request_is_dropped_by_the_thread() {
        let worker = ParseWorker::new(ParseConfig::default());
        let latest = Generation::default();
        let stale = latest.issue();
        latest.issue();
        worker
            .spawn(
                FileKind::Forces,
                stale,
                latest,
                "a.mot".into(),
                Vec::new(),
            )
            .unwrap();
        assert!(worker.recv_timeout(Duration::from_millis(500)).is_none());
    }
}
