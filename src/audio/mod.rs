pub mod clip;

pub use clip::{encode_wav, AudioClip};
