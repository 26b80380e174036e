pub mod azure;
pub mod backend;
pub mod events;
pub mod replay;

pub use azure::AzureEngine;
pub use backend::{EngineFactory, RecognitionEngine, RecognitionRequest};
pub use events::{CancellationReason, EngineSink, RecognitionEvent};
pub use replay::{ReplayEngine, ReplayScript, ReplayStep};
