//! Audio capture collaborator interface.
//!
//! The core never owns a microphone. A host supplies frames through
//! `CaptureSource` at a fixed cadence (~30 Hz recommended) and reports
//! failure through `CaptureError`, which the scheduler treats as a
//! "monitoring degraded" condition rather than a fault.

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// One poll's worth of time-domain samples, normalized to [-1, 1].
/// Produced by a capture source, consumed once by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    pub samples: Vec<f32>,
}

impl SampleFrame {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square amplitude of the frame.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }

    /// Every `step`-th sample, for display purposes.
    pub fn downsample(&self, step: usize) -> Vec<f32> {
        if step <= 1 {
            return self.samples.clone();
        }
        self.samples.iter().step_by(step).copied().collect()
    }
}

/// Continuous sample producer with an explicit start/stop lifecycle.
///
/// `stop` must be idempotent; `start` fails closed on permission or
/// device errors. `poll` returns `Ok(None)` when no frame is ready yet.
pub trait CaptureSource {
    fn start(&mut self) -> Result<(), CaptureError>;

    fn stop(&mut self);

    fn poll(&mut self) -> Result<Option<SampleFrame>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_frame_is_amplitude() {
        let frame = SampleFrame::new(vec![0.5; 256]);
        assert!((frame.rms() - 0.5).abs() < 1e-6);

        let frame = SampleFrame::new(vec![-0.25; 256]);
        assert!((frame.rms() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rms_of_empty_frame_is_zero() {
        assert_eq!(SampleFrame::new(vec![]).rms(), 0.0);
    }

    #[test]
    fn downsample_keeps_every_nth() {
        let frame = SampleFrame::new((0..16).map(|i| i as f32).collect());
        let down = frame.downsample(8);
        assert_eq!(down, vec![0.0, 8.0]);
    }
}
