pub mod analysis;
pub mod decode;
pub mod fft;
pub mod field;

pub use analysis::{analyze, AnalysisJob, AnalysisParams, Progress};
pub use field::{MagnitudeField, SampleBuffer};
