//! Forward wavelet transform pipeline and tag-chunk bitstream encoder core
//! for a high-bitrate post-production intermediate codec.
//!
//! This crate covers the encoder core only: pixel-format conversion, audio,
//! and decoding live outside its scope. See [`Encoder`] for the entry point.

pub mod array2d;
pub mod bitstream;
pub mod codebook;
pub mod encoder;
pub mod entropy;
pub mod error;
pub mod format;
pub mod metadata;
pub mod override_file;
pub mod quantizer;
pub mod sample;
pub mod tags;
pub mod transform;
pub mod util;
pub mod wavelet;

pub use encoder::{Encoder, EncoderConfig};
pub use error::{CodecError, CodecResult};
pub use format::{ChannelKind, ColorspaceRgb, ColorspaceYuv, InputPixelFormat, PlanarFrame, Plane, QualityWord};
