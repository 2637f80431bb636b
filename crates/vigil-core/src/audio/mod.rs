mod capture;
mod classifier;

pub use capture::{CaptureSource, SampleFrame};
pub use classifier::{
    BreathingClassifier, BreathingMetrics, BreathingMode, SubscriptionId,
};
