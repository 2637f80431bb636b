//! Breathing signal classifier.
//!
//! Turns raw sample frames into a breathing/silence classification and an
//! estimated breath rate. Classification is a pure function of the frame
//! plus a small ring of recent peak timestamps; the caller drives it by
//! feeding one frame per poll tick (~30 Hz) together with the tick's
//! wall-clock snapshot.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capture::SampleFrame;

/// Minimum gap between recorded breath peaks. Implies a ceiling of
/// ~40 breaths/minute.
const PEAK_DEBOUNCE_MS: i64 = 1_500;

/// How many recent peaks the BPM estimate looks at.
const PEAK_RING: usize = 5;

/// Display waveform keeps every 8th sample.
const DOWNSAMPLE_STEP: usize = 8;

/// Sensitivity profile for the breathing threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingMode {
    /// One person near the microphone.
    SinglePerson,
    /// Two people: noisier, more continuous baseline, lower threshold.
    TwoPerson,
}

impl Default for BreathingMode {
    fn default() -> Self {
        BreathingMode::SinglePerson
    }
}

impl BreathingMode {
    /// RMS threshold above which the frame counts as breathing.
    pub fn sensitivity(self) -> f32 {
        match self {
            BreathingMode::SinglePerson => 0.02,
            BreathingMode::TwoPerson => 0.015,
        }
    }
}

/// Snapshot emitted once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingMetrics {
    /// RMS volume, 0.0 - 1.0.
    pub volume: f32,
    pub is_breathing: bool,
    /// Estimated breaths per minute; 0 until two peaks are recorded.
    pub bpm: u32,
    /// Downsampled frame for display only.
    pub raw: Vec<f32>,
}

/// Handle returned by `subscribe`. Unsubscribing twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type MetricsCallback = Box<dyn FnMut(&BreathingMetrics)>;

/// Frame-by-frame breathing classifier with subscriber fan-out.
pub struct BreathingClassifier {
    mode: BreathingMode,
    last_peak: Option<DateTime<Utc>>,
    peaks: VecDeque<DateTime<Utc>>,
    subscribers: Vec<(u64, MetricsCallback)>,
    next_subscriber_id: u64,
}

impl BreathingClassifier {
    pub fn new(mode: BreathingMode) -> Self {
        Self {
            mode,
            last_peak: None,
            peaks: VecDeque::with_capacity(PEAK_RING),
            subscribers: Vec::new(),
            next_subscriber_id: 0,
        }
    }

    pub fn mode(&self) -> BreathingMode {
        self.mode
    }

    /// Change the sensitivity profile. Takes effect on the next frame.
    pub fn set_mode(&mut self, mode: BreathingMode) {
        self.mode = mode;
    }

    /// Register a callback invoked synchronously for every frame's metrics.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&BreathingMetrics) + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        SubscriptionId(id)
    }

    /// Remove a subscriber. Safe to call more than once.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id.0);
    }

    /// Classify one frame and deliver the metrics to all subscribers
    /// before returning.
    pub fn process_frame(
        &mut self,
        frame: &SampleFrame,
        now: DateTime<Utc>,
    ) -> BreathingMetrics {
        let threshold = self.mode.sensitivity();
        let volume = frame.rms();
        let is_breathing = volume > threshold;

        if is_breathing && volume > threshold * 1.5 {
            let debounced = self
                .last_peak
                .map(|last| (now - last).num_milliseconds() >= PEAK_DEBOUNCE_MS)
                .unwrap_or(true);
            if debounced {
                self.peaks.push_back(now);
                self.last_peak = Some(now);
                if self.peaks.len() > PEAK_RING {
                    self.peaks.pop_front();
                }
            }
        }

        let metrics = BreathingMetrics {
            volume,
            is_breathing,
            bpm: self.estimate_bpm(),
            raw: frame.downsample(DOWNSAMPLE_STEP),
        };

        for (_, callback) in &mut self.subscribers {
            callback(&metrics);
        }

        metrics
    }

    /// `60000 / mean inter-peak interval` over the retained ring.
    fn estimate_bpm(&self) -> u32 {
        if self.peaks.len() < 2 {
            return 0;
        }
        let first = self.peaks.front().unwrap();
        let last = self.peaks.back().unwrap();
        let span_ms = (*last - *first).num_milliseconds();
        if span_ms <= 0 {
            return 0;
        }
        let avg_interval = span_ms as f64 / (self.peaks.len() - 1) as f64;
        (60_000.0 / avg_interval).round() as u32
    }
}

impl Default for BreathingClassifier {
    fn default() -> Self {
        Self::new(BreathingMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn frame(amplitude: f32) -> SampleFrame {
        SampleFrame::new(vec![amplitude; 512])
    }

    #[test]
    fn constant_amplitude_classifies_by_mode_threshold() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        let metrics = classifier.process_frame(&frame(0.018), at(0));
        assert!((metrics.volume - 0.018).abs() < 1e-6);
        assert!(!metrics.is_breathing); // below 0.02

        classifier.set_mode(BreathingMode::TwoPerson);
        let metrics = classifier.process_frame(&frame(0.018), at(33));
        assert!(metrics.is_breathing); // above 0.015
    }

    #[test]
    fn bpm_zero_below_two_peaks() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        let metrics = classifier.process_frame(&frame(0.1), at(0));
        assert_eq!(metrics.bpm, 0);
    }

    #[test]
    fn two_peaks_two_seconds_apart_give_30_bpm() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        classifier.process_frame(&frame(0.1), at(0));
        let metrics = classifier.process_frame(&frame(0.1), at(2_000));
        assert_eq!(metrics.bpm, 30);
    }

    #[test]
    fn peaks_within_debounce_are_ignored() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        classifier.process_frame(&frame(0.1), at(0));
        // 1000 ms later: still within the 1500 ms debounce window.
        let metrics = classifier.process_frame(&frame(0.1), at(1_000));
        assert_eq!(metrics.bpm, 0);
    }

    #[test]
    fn peak_ring_keeps_most_recent_five() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        // Seven peaks 2 s apart; ring retains the last five.
        for i in 0..7 {
            classifier.process_frame(&frame(0.1), at(i * 2_000));
        }
        assert_eq!(classifier.peaks.len(), 5);
        assert_eq!(*classifier.peaks.front().unwrap(), at(4_000));
    }

    #[test]
    fn loud_frame_below_peak_threshold_records_no_peak() {
        // Breathing (above 0.02) but below 1.5x threshold (0.03).
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        let metrics = classifier.process_frame(&frame(0.025), at(0));
        assert!(metrics.is_breathing);
        assert!(classifier.peaks.is_empty());
    }

    #[test]
    fn subscribers_receive_metrics_synchronously() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = classifier.subscribe(move |m| sink.borrow_mut().push(m.volume));

        classifier.process_frame(&frame(0.5), at(0));
        assert_eq!(seen.borrow().len(), 1);

        classifier.unsubscribe(id);
        classifier.unsubscribe(id); // repeated unsubscribe is a no-op
        classifier.process_frame(&frame(0.5), at(33));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn raw_is_downsampled() {
        let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
        let metrics = classifier.process_frame(&frame(0.1), at(0));
        assert_eq!(metrics.raw.len(), 512usize.div_ceil(8));
    }
}
