//! Fixed-timestep timeline controller.
//!
//! Elapsed wall-clock time is accumulated and converted into whole frame
//! steps; the remainder carries over to the next tick so playback speed does
//! not depend on how often the host calls [`Timeline::tick`].
//!
//! Invariants held after every call:
//! `crop_start <= current_frame <= crop_end <= sequence_end`, and
//! `crop_start < crop_end` whenever `sequence_end >= 1`.

use std::collections::VecDeque;

use movilo_mocap_core::MarkerDataset;

use crate::config::TimelineConfig;
use crate::inputs::TimelineCommand;
use crate::outputs::{TickReport, TimelineEvent, TimelineSnapshot};

#[derive(Clone, Debug)]
pub struct Timeline {
    cfg: TimelineConfig,
    times: Vec<f64>,
    current_frame: usize,
    crop_start: usize,
    crop_end: usize,
    sequence_end: usize,
    playing: bool,
    looping: bool,
    step_millis: Option<f64>,
    accumulated_millis: f64,
    last_tick: Option<f64>,
    events: VecDeque<TimelineEvent>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

/// Milliseconds between the first two samples, if usable as a step.
fn step_from(times: &[f64]) -> Option<f64> {
    let &[t0, t1, ..] = times else {
        return None;
    };
    let step = (t1 - t0) * 1000.0;
    (step.is_finite() && step > 0.0).then_some(step)
}

/// Whole steps in `accumulated`, taken only while strictly more than one
/// step remains. Returns the count and the remainder, which lies in
/// `(0, step]` whenever a step was taken.
fn whole_steps(accumulated: f64, step: f64) -> (usize, f64) {
    if accumulated <= step {
        return (0, accumulated);
    }
    let mut count = ((accumulated / step).ceil() - 1.0).max(0.0);
    let mut rest = accumulated - count * step;
    if rest > step {
        count += 1.0;
        rest -= step;
    } else if rest <= 0.0 && count >= 1.0 {
        count -= 1.0;
        rest += step;
    }
    (count as usize, rest)
}

impl Timeline {
    pub fn new(cfg: TimelineConfig) -> Self {
        Self {
            looping: cfg.looping,
            cfg,
            times: Vec::new(),
            current_frame: 0,
            crop_start: 0,
            crop_end: 0,
            sequence_end: 0,
            playing: false,
            step_millis: None,
            accumulated_millis: 0.0,
            last_tick: None,
            events: VecDeque::new(),
        }
    }

    /// Adopt a freshly parsed marker dataset.
    pub fn load(&mut self, dataset: &MarkerDataset) {
        self.load_times(dataset.frames.iter().map(|f| f.time));
    }

    /// Adopt a sequence of frame times (seconds). Resets the crop window to
    /// the full sequence and clears the accumulator.
    pub fn load_times<I: IntoIterator<Item = f64>>(&mut self, times: I) {
        self.times = times.into_iter().collect();
        // The final exported row is incomplete in lab exports and never shown.
        self.sequence_end = self.times.len().saturating_sub(2);
        self.crop_start = 0;
        self.crop_end = self.sequence_end;
        self.accumulated_millis = 0.0;
        self.last_tick = None;
        self.step_millis = step_from(&self.times);

        let clamped = self.current_frame.min(self.crop_end);
        self.set_frame(clamped);

        if self.step_millis.is_none() && self.playing {
            self.playing = false;
            self.push_event(TimelineEvent::Paused {
                frame: self.current_frame,
            });
        }
        log::debug!(
            "timeline loaded {} frames (sequence end {}, step {:?} ms)",
            self.times.len(),
            self.sequence_end,
            self.step_millis
        );
    }

    // --- accessors ---

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn crop_start(&self) -> usize {
        self.crop_start
    }

    pub fn crop_end(&self) -> usize {
        self.crop_end
    }

    pub fn sequence_end(&self) -> usize {
        self.sequence_end
    }

    pub fn frame_count(&self) -> usize {
        self.times.len()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn step_millis(&self) -> Option<f64> {
        self.step_millis
    }

    pub fn accumulated_millis(&self) -> f64 {
        self.accumulated_millis
    }

    pub fn last_tick(&self) -> Option<f64> {
        self.last_tick
    }

    /// Sample time (seconds) of a frame, if loaded.
    pub fn time_of(&self, frame: usize) -> Option<f64> {
        self.times.get(frame).copied()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            current_frame: self.current_frame,
            crop_start: self.crop_start,
            crop_end: self.crop_end,
            sequence_end: self.sequence_end,
            frame_count: self.times.len(),
            playing: self.playing,
            looping: self.looping,
            step_millis: self.step_millis,
            crop_start_time: self.time_of(self.crop_start),
            current_time: self.time_of(self.current_frame),
            crop_end_time: self.time_of(self.crop_end),
        }
    }

    /// Take every event emitted since the previous drain.
    pub fn drain_events(&mut self) -> Vec<TimelineEvent> {
        self.events.drain(..).collect()
    }

    // --- commands ---

    /// Message-style dispatch. Returns whether the command was accepted.
    pub fn apply(&mut self, cmd: TimelineCommand) -> bool {
        match cmd {
            TimelineCommand::Play => self.play(),
            TimelineCommand::Pause => self.pause(),
            TimelineCommand::TogglePlay => self.toggle_play(),
            TimelineCommand::Seek { frame } => self.seek(frame),
            TimelineCommand::SeekExact { frame } => self.seek_exact(frame),
            TimelineCommand::SetLooping { looping } => self.set_looping(looping),
            TimelineCommand::SetCropStart { frame } => self.set_crop_start(frame),
            TimelineCommand::SetCropEnd { frame } => self.set_crop_end(frame),
            TimelineCommand::ResetCrop => self.reset_crop(),
        }
    }

    pub fn toggle_play(&mut self) -> bool {
        if self.playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Start playback. Rewinds to the crop start when sitting at (or past)
    /// the crop end. Rejected while no usable step is known.
    pub fn play(&mut self) -> bool {
        if self.playing {
            return false;
        }
        if self.step_millis.is_none() {
            log::trace!("play ignored: no usable frame step");
            return false;
        }
        if self.current_frame >= self.crop_end {
            self.set_frame(self.crop_start);
        }
        self.playing = true;
        self.push_event(TimelineEvent::Started {
            frame: self.current_frame,
        });
        true
    }

    /// Stop playback. The accumulator is kept; the tick clock restarts on
    /// the next play.
    pub fn pause(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.playing = false;
        self.last_tick = None;
        self.push_event(TimelineEvent::Paused {
            frame: self.current_frame,
        });
        true
    }

    pub fn set_looping(&mut self, looping: bool) -> bool {
        self.looping = looping;
        true
    }

    /// Jump inside the crop window, or step one frame toward a target that
    /// lies outside it.
    pub fn seek(&mut self, target: usize) -> bool {
        if self.in_window(target) {
            self.set_frame(target);
            true
        } else if target < self.crop_start && self.current_frame > self.crop_start {
            self.set_frame(self.current_frame - 1);
            true
        } else if target > self.crop_end && self.current_frame < self.crop_end {
            self.set_frame(self.current_frame + 1);
            true
        } else {
            log::trace!(
                "seek to {target} ignored (window {}..={}, current {})",
                self.crop_start,
                self.crop_end,
                self.current_frame
            );
            false
        }
    }

    /// Jump only when the target lies inside the crop window.
    pub fn seek_exact(&mut self, target: usize) -> bool {
        if !self.in_window(target) {
            log::trace!("exact seek to {target} ignored: outside crop window");
            return false;
        }
        self.set_frame(target);
        true
    }

    /// Move the crop start; the current frame is pulled along if it would
    /// fall before the new start.
    pub fn set_crop_start(&mut self, frame: usize) -> bool {
        if frame >= self.crop_end {
            log::trace!("crop start {frame} rejected (crop end {})", self.crop_end);
            return false;
        }
        self.crop_start = frame;
        if frame > self.current_frame {
            self.set_frame(frame);
        }
        true
    }

    /// Move the crop end; the current frame is pulled back if it would fall
    /// after the new end.
    pub fn set_crop_end(&mut self, frame: usize) -> bool {
        if frame <= self.crop_start || frame > self.sequence_end {
            log::trace!(
                "crop end {frame} rejected (crop start {}, sequence end {})",
                self.crop_start,
                self.sequence_end
            );
            return false;
        }
        self.crop_end = frame;
        if frame < self.current_frame {
            self.set_frame(frame);
        }
        true
    }

    pub fn reset_crop(&mut self) -> bool {
        self.crop_start = 0;
        self.crop_end = self.sequence_end;
        true
    }

    // --- clock ---

    /// Advance by the wall-clock time elapsed since the previous tick.
    /// `timestamp_ms` must come from a monotonic clock; a timestamp earlier
    /// than the previous one counts as zero elapsed time.
    pub fn tick(&mut self, timestamp_ms: f64) -> TickReport {
        let mut report = TickReport::default();
        let Some(step) = self.step_millis else {
            return report;
        };
        if !self.playing || !timestamp_ms.is_finite() {
            return report;
        }

        let elapsed = self
            .last_tick
            .map_or(0.0, |last| (timestamp_ms - last).max(0.0));
        self.accumulated_millis += elapsed;

        let (steps, remainder) = whole_steps(self.accumulated_millis, step);
        self.accumulated_millis = remainder;
        self.advance(steps, &mut report);

        self.last_tick = self.playing.then_some(timestamp_ms);
        report
    }

    /// Move `steps` frames forward inside the crop window, wrapping or
    /// stopping at its end.
    fn advance(&mut self, steps: usize, report: &mut TickReport) {
        let start = self.current_frame;
        let to_end = self.crop_end - start;
        if steps <= to_end {
            self.current_frame += steps;
            report.steps = steps;
            self.note_move(start);
            return;
        }

        self.current_frame = self.crop_end;
        self.note_move(start);
        if self.looping {
            let period = self.crop_end - self.crop_start + 1;
            self.current_frame = self.crop_start + (steps - to_end - 1) % period;
            report.steps = steps;
            report.wrapped = true;
            self.push_event(TimelineEvent::Wrapped {
                from: self.crop_end,
                to: self.crop_start,
            });
            self.note_move(self.crop_end);
        } else {
            self.playing = false;
            report.steps = to_end;
            report.ended = true;
            self.push_event(TimelineEvent::Ended {
                frame: self.current_frame,
            });
        }
    }

    fn note_move(&mut self, from: usize) {
        if from != self.current_frame {
            self.push_event(TimelineEvent::FrameChanged {
                from,
                to: self.current_frame,
            });
        }
    }

    // --- helpers ---

    fn in_window(&self, frame: usize) -> bool {
        (self.crop_start..=self.crop_end).contains(&frame)
    }

    fn set_frame(&mut self, frame: usize) {
        if frame != self.current_frame {
            let from = self.current_frame;
            self.current_frame = frame;
            self.push_event(TimelineEvent::FrameChanged { from, to: frame });
        }
    }

    fn push_event(&mut self, event: TimelineEvent) {
        if self.cfg.max_pending_events == 0 {
            return;
        }
        while self.events.len() >= self.cfg.max_pending_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(frames: usize, dt: f64) -> Timeline {
        let mut tl = Timeline::default();
        tl.load_times((0..frames).map(|i| i as f64 * dt));
        tl
    }

    #[test]
    fn step_requires_two_increasing_samples() {
        assert_eq!(step_from(&[]), None);
        assert_eq!(step_from(&[0.0]), None);
        assert_eq!(step_from(&[0.0, 0.0]), None);
        assert_eq!(step_from(&[0.1, 0.0]), None);
        assert_eq!(step_from(&[0.0, f64::INFINITY]), None);
        assert_eq!(step_from(&[0.0, 0.5, 0.6]), Some(500.0));
    }

    #[test]
    fn whole_steps_keep_a_positive_remainder() {
        assert_eq!(whole_steps(0.0, 20.0), (0, 0.0));
        assert_eq!(whole_steps(20.0, 20.0), (0, 20.0));
        assert_eq!(whole_steps(33.0, 20.0), (1, 13.0));
        assert_eq!(whole_steps(1000.0, 125.0), (7, 125.0));
        let (count, rest) = whole_steps(1.0e12, 1.0);
        assert_eq!(count, 999_999_999_999);
        assert!(rest > 0.0 && rest <= 1.0);
    }

    #[test]
    fn sequence_end_excludes_last_sample() {
        assert_eq!(loaded(0, 0.01).sequence_end(), 0);
        assert_eq!(loaded(1, 0.01).sequence_end(), 0);
        assert_eq!(loaded(2, 0.01).sequence_end(), 0);
        assert_eq!(loaded(30, 0.01).sequence_end(), 28);
    }

    #[test]
    fn event_queue_is_bounded() {
        let mut tl = Timeline::new(TimelineConfig {
            max_pending_events: 2,
            ..TimelineConfig::default()
        });
        tl.load_times((0..30).map(|i| i as f64 * 0.02));
        tl.seek(1);
        tl.seek(2);
        tl.seek(3);
        assert_eq!(
            tl.drain_events(),
            vec![
                TimelineEvent::FrameChanged { from: 1, to: 2 },
                TimelineEvent::FrameChanged { from: 2, to: 3 },
            ]
        );
        assert!(tl.drain_events().is_empty());
    }
}
