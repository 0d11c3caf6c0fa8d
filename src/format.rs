//! Pixel format tags and the internal planar representation.
//!
//! Actual pixel-format conversion (YUYV/V210/Bayer/... -> planar 16-bit) is
//! an external collaborator's job; this module only names the formats the
//! encoder needs to branch on (precision, chroma layout, neutral fill value).

use crate::array2d::Array2D;

/// Input pixel formats the encoder can be configured for. Conversion to the
/// internal planar representation happens before the core ever sees a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPixelFormat {
  Yuyv,
  Uyvy,
  V210,
  Yu64,
  Rgb24,
  Rgb32,
  Rgba,
  Qt32Bgra,
  B64a,
  R4fl,
  V408R408,
  Byr1,
  Byr2,
  Byr3,
  Byr4,
  Byr5,
  Rg30R210Dpx0Ar10Ab10,
  Rg48,
  Rg64,
  Nv12,
  Yv12,
  CbYCrYVariant,
}

impl InputPixelFormat {
  /// Bits per sample of the *source* pixels, used to pick the prescale table
  /// entry.
  pub fn precision(self) -> u32 {
    use InputPixelFormat::*;
    match self {
      Yuyv | Uyvy | Nv12 | Yv12 | CbYCrYVariant | Rgb24 | Rgb32 | Rgba | Qt32Bgra => 8,
      V210 | Yu64 => 10,
      Byr1 | Byr2 | Byr3 | Byr4 | Byr5 | Rg30R210Dpx0Ar10Ab10 => 12,
      Rg48 | Rg64 | R4fl | B64a | V408R408 => 16,
    }
  }

  /// Whether the format is RGB/RGBA/Bayer rather than YUV.
  pub fn is_rgb_family(self) -> bool {
    use InputPixelFormat::*;
    matches!(
      self,
      Rgb24
        | Rgb32
        | Rgba
        | Qt32Bgra
        | B64a
        | R4fl
        | Byr1
        | Byr2
        | Byr3
        | Byr4
        | Byr5
        | Rg30R210Dpx0Ar10Ab10
        | Rg48
        | Rg64
    )
  }

  /// Number of planar channels the internal representation uses for this
  /// format, mirroring `frame.h`'s `FRAME_FORMAT_{GRAY,YUV,RGB,RGBA}` split.
  pub fn num_channels(self) -> usize {
    use InputPixelFormat::*;
    match self {
      Rgba | Qt32Bgra | B64a => 4,
      _ => 3,
    }
  }

  /// Whether chroma is carried at full (4:4:4) resolution rather than 4:2:2.
  pub fn chroma_full_res(self) -> bool {
    self.is_rgb_family()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorspaceYuv {
  Bt601,
  Bt709,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorspaceRgb {
  CgRgb,
  VsRgb,
}

/// The neutral (padding) sample value for a given channel kind, used when
/// rounding frame height up to a multiple of 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
  Luma,
  Chroma,
  Rgb,
}

impl ChannelKind {
  pub fn neutral_value(self, precision: u32) -> i16 {
    match self {
      ChannelKind::Luma => 16i16 << (precision - 8),
      ChannelKind::Chroma => 128i16 << (precision - 8),
      ChannelKind::Rgb => 0,
    }
  }
}

/// One planar channel of 16-bit signed coefficients/samples.
#[derive(Clone)]
pub struct Plane {
  pub width: usize,
  pub height: usize,
  pub kind: ChannelKind,
  pub data: Array2D<i16>,
}

impl Plane {
  pub fn new(width: usize, height: usize, kind: ChannelKind, precision: u32) -> Self {
    let mut data = Array2D::zeroed(height, width);
    let neutral = kind.neutral_value(precision);
    if neutral != 0 {
      data.fill_with(|_, _| neutral);
    }
    Self { width, height, kind, data }
  }
}

/// The internal planar representation handed to the level-1 transform.
///
/// `channels.len()` follows the `frame.h` convention: 1 for gray, 3 for
/// YUV/RGB, 4 for RGBA (`FRAME_MAX_CHANNELS` there is 4; so is ours).
pub struct PlanarFrame {
  pub channels: Vec<Plane>,
  /// ROUND8-padded height used for the transform.
  pub padded_height: usize,
  /// Original (pre-padding) height, kept for the sample header.
  pub display_height: usize,
}

impl PlanarFrame {
  pub fn channel(&self, idx: usize) -> &Plane {
    &self.channels[idx]
  }

  pub fn channel_mut(&mut self, idx: usize) -> &mut Plane {
    &mut self.channels[idx]
  }

  pub fn num_channels(&self) -> usize {
    self.channels.len()
  }

  /// Pack every channel's samples as contiguous big-endian 16-bit words, in
  /// channel order. Used for the uncompressed pass-through chunk, which
  /// carries this crate's internal planar samples directly since
  /// format-specific repacking back to the original pixel layout is outside
  /// this crate's scope.
  pub fn pack_be_words(&self) -> Vec<u8> {
    let mut out = Vec::new();
    for plane in &self.channels {
      for r in 0..plane.data.rows() {
        for &v in &plane.data[r] {
          out.extend_from_slice(&(v as u16).to_be_bytes());
        }
      }
    }
    out
  }
}

/// Packed 32-bit quality word.
///
/// Bit layout:
/// - bits 0..=7:   preset index (fixed quality curve)
/// - bits 8..=12:  uncompressed-pass-through target (0..=16, out of 16)
/// - bits 24..=26: temporal-quality factor
/// - bits 25..=26: RGB-quality chroma gain selector (overlaps bits 24-26
///   intentionally)
/// - bit 30:       "optimize empty channels" flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityWord(pub u32);

impl QualityWord {
  pub fn preset(self) -> u8 {
    (self.0 & 0xFF) as u8
  }

  pub fn uncompressed_target_bits(self) -> u8 {
    ((self.0 >> 8) & 0x1F) as u8
  }

  pub fn temporal_quality_factor(self) -> u8 {
    ((self.0 >> 24) & 0x7) as u8
  }

  pub fn rgb_chroma_gain_selector(self) -> u8 {
    ((self.0 >> 25) & 0x3) as u8
  }

  pub fn optimize_empty_channels(self) -> bool {
    (self.0 >> 30) & 1 != 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quality_word_extracts_fields() {
    let q = QualityWord(5 | (3 << 8) | (1 << 30));
    assert_eq!(q.preset(), 5);
    assert_eq!(q.uncompressed_target_bits(), 3);
    assert!(q.optimize_empty_channels());
  }

  #[test]
  fn neutral_values_match_color_space() {
    assert_eq!(ChannelKind::Luma.neutral_value(8), 16);
    assert_eq!(ChannelKind::Chroma.neutral_value(8), 128);
    assert_eq!(ChannelKind::Rgb.neutral_value(8), 0);
    assert_eq!(ChannelKind::Luma.neutral_value(10), 64);
  }

  #[test]
  fn pixel_format_precision_and_channels() {
    assert_eq!(InputPixelFormat::Yuyv.precision(), 8);
    assert_eq!(InputPixelFormat::V210.precision(), 10);
    assert_eq!(InputPixelFormat::Rg48.precision(), 16);
    assert_eq!(InputPixelFormat::Rgba.num_channels(), 4);
    assert_eq!(InputPixelFormat::Yuyv.num_channels(), 3);
    assert!(InputPixelFormat::Byr1.chroma_full_res());
    assert!(!InputPixelFormat::Yuyv.chroma_full_res());
  }
}
