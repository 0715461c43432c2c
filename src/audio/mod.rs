//! Audio pipeline stages: frame type, decode, resample, filter, encode

pub mod decoder;
pub mod encoder;
pub mod filters;
pub mod frame;
pub mod resampler;

pub use decoder::{Decoder, OpusDecoder};
pub use encoder::{Encoder, EncoderConfig, OpusEncoder};
pub use filters::{EqualizerBand, Filter, FilterChain, FilterConfig};
pub use frame::AudioFrame;
pub use resampler::StreamResampler;
