//! Report persistence: the stored record shape and sinks that write it

mod record;
mod sink;

pub use record::{AssessmentSource, ReportRecord, SpeechType};
pub use sink::{JsonLinesSink, ReportSink};
