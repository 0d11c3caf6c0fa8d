//! Error types for the encoder core.
//!
//! All five kinds are sticky: once set on [`crate::Encoder`], they persist
//! until the caller explicitly resets group state, per the error-handling
//! policy the core follows.

use thiserror::Error;

/// Result type used throughout the encoder core.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Errors the encoder core can signal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
  /// Codebook table construction failed during encoder initialization.
  #[error("codebook initialization failed")]
  InitCodebooks,

  /// Unsupported input color format, oversized width, or a format/license
  /// mismatch.
  #[error("invalid input format")]
  InvalidFormat,

  /// Configured dimensions exceed the encoder's limits.
  #[error("invalid frame dimensions")]
  InvalidSize,

  /// The output buffer was exhausted mid-emission; the sample is abandoned.
  #[error("bitstream overflow")]
  BitstreamOverflow,

  /// Scratch buffer or pyramid allocation failed.
  #[error("allocation failure")]
  Memory,
}
