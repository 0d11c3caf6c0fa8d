//! The group-of-pictures state machine and tag-chunk sample layout.

use log::{debug, trace};

use crate::bitstream::BitWriter;
use crate::error::{CodecError, CodecResult};
use crate::format::{PlanarFrame, QualityWord};
use crate::metadata::MetadataBlock;
use crate::quantizer::{self, QuantizerState};
use crate::tags;
use crate::transform::{self, PyramidShape, Transform};
use crate::wavelet::{self, Wavelet, WaveletKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
  Idle,
  GroupOpen,
  Emitting,
}

pub struct SampleConfig {
  pub gop_length: u32,
  pub num_spatial: u32,
  pub precision: u32,
  pub progressive: bool,
  pub field_plus: bool,
  pub quality: QualityWord,
  pub optimize_empty_channels: bool,
  /// Target bitrate in bits/second; 0 disables rate control.
  pub fixed_bitrate: u32,
  pub frame_rate: u32,
}

/// Drives the `Idle -> GroupOpen -> Emitting` lifecycle and owns the
/// pyramid/metadata state that persists between `EncodeSample` calls.
pub struct SampleAssembler {
  state: GroupState,
  cfg: SampleConfig,
  count: u32,
  frame_number: u64,
  pending_frames: Vec<PlanarFrame>,
  pub global_metadata: MetadataBlock,
  pub local_metadata: MetadataBlock,
  pub quantizer: QuantizerState,
}

impl SampleAssembler {
  pub fn new(cfg: SampleConfig) -> Self {
    let mut quantizer = QuantizerState::new();
    quantizer.set_quality(cfg.quality, cfg.progressive, cfg.precision, cfg.gop_length, false);
    Self {
      state: GroupState::Idle,
      cfg,
      count: 0,
      frame_number: 0,
      pending_frames: Vec::new(),
      global_metadata: MetadataBlock::new(),
      local_metadata: MetadataBlock::new(),
      quantizer,
    }
  }

  pub fn state(&self) -> GroupState {
    self.state
  }

  /// Number of samples emitted so far, used to seed the uncompressed
  /// pass-through decision deterministically per frame.
  pub fn frame_number(&self) -> u64 {
    self.frame_number
  }

  /// Feed one frame into the current group. Returns `true` once a group has
  /// filled (the caller should immediately call [`Self::emit`]).
  pub fn push_frame(&mut self, frame: PlanarFrame) -> bool {
    match self.state {
      GroupState::Idle => {
        self.pending_frames.push(frame);
        self.count = 1;
        if self.count == self.cfg.gop_length {
          self.state = GroupState::Emitting;
          true
        } else {
          self.state = GroupState::GroupOpen;
          false
        }
      }
      GroupState::GroupOpen => {
        self.pending_frames.push(frame);
        self.count += 1;
        if self.count == self.cfg.gop_length {
          self.state = GroupState::Emitting;
          true
        } else {
          false
        }
      }
      GroupState::Emitting => {
        debug!("push_frame called while a filled group is awaiting emit; dropping stale group state");
        self.reset_group();
        self.push_frame(frame)
      }
    }
  }

  fn reset_group(&mut self) {
    self.pending_frames.clear();
    self.count = 0;
    self.state = GroupState::Idle;
  }

  /// Build the pyramid(s) for the buffered frames and serialize the full
  /// tag-chunk sample into `writer`.
  pub fn emit(&mut self, writer: &mut BitWriter) -> CodecResult<()> {
    if self.state != GroupState::Emitting {
      return Err(CodecError::InvalidSize);
    }
    let frames = std::mem::take(&mut self.pending_frames);
    self.reset_group();
    self.frame_number += 1;

    let before = writer.bytes_written();
    let result = build_and_emit_sample(writer, &frames, &self.cfg, &self.quantizer, &self.global_metadata, &self.local_metadata, self.frame_number);

    if writer.overflowed() {
      return Err(CodecError::BitstreamOverflow);
    }
    if result.is_ok() {
      self.quantizer.last_gop_bytes = writer.bytes_written() - before;
      self.quantizer.apply_rate_control(self.cfg.fixed_bitrate, self.cfg.frame_rate.max(1), self.cfg.gop_length);
    }
    result
  }
}

fn is_constant_band(band: &wavelet::Band) -> Option<i16> {
  if band.is_empty() {
    return None;
  }
  let first = band.coeffs[0][0];
  for r in 0..band.coeffs.rows() {
    if band.coeffs[r].iter().any(|&v| v != first) {
      return None;
    }
  }
  Some(first)
}

fn emit_lowpass(writer: &mut BitWriter, band: &wavelet::Band, width: usize, height: usize, optimize_empty: bool) {
  if optimize_empty {
    if let Some(value) = is_constant_band(band) {
      writer.put_bits(32, tags::LOWPASS_CONSTANT_SENTINEL);
      writer.put_bits(32, value as i32 as u32);
      writer.put_bits(16, width as u32);
      writer.put_bits(16, height as u32);
      return;
    }
  }

  let handle = writer.size_tag_push(tags::LOWPASS_HEADER);
  for r in 0..band.coeffs.rows() {
    for &v in &band.coeffs[r] {
      writer.put_bits(16, v as u16 as u32);
    }
  }
  writer.size_tag_pop(handle);
}

/// Emit a wavelet's highpass bands top-down: `HIGHPASS_HEADER`, each of
/// bands LH/HL/HH (or the single highpass band of a temporal wavelet) with
/// its own `BAND_HEADER`/coefficients/`BAND_END_CODE`/`BAND_TRAILER`
/// framing, then `HIGHPASS_TRAILER`.
///
/// Two per-band behaviors are decided here rather than carried on the
/// quantizer state: two-pass lossless coding kicks in for the designated
/// band (global subband index 1) whenever the quality preset calls for
/// bit-exact reconstruction, and horizontal-difference pre-coding kicks in
/// for the LH/HL bands of a top-level spatial wavelet at high source
/// precision, where a row's coefficients tend to be smooth.
fn emit_highpass(writer: &mut BitWriter, wavelet: &Wavelet, subband_base: u8, quant: &QuantizerState, is_chroma: bool) {
  let handle = writer.size_tag_push(tags::HIGHPASS_HEADER);
  for (local_index, band) in wavelet.bands.iter().skip(1).enumerate() {
    let subband = subband_base as usize + local_index;
    let subband_index = subband as u8;
    let mut flags = quant.flags(subband);

    if quant.lossless && subband == 1 {
      flags.two_pass = true;
    }
    if quant.precision >= 12 && wavelet.kind == WaveletKind::Spatial && local_index < 2 {
      flags.diff = true;
    }

    if band.is_empty() {
      crate::entropy::encode_band(writer, band, tags::EMPTY_SUBBAND_INDEX as u8, flags);
      continue;
    }
    if flags.two_pass {
      crate::entropy::encode_band_two_pass(writer, band, subband_index, flags);
    } else {
      crate::entropy::encode_band(writer, band, subband_index, flags);
    }
    let _ = is_chroma;
  }
  writer.size_tag_pop(handle);
}

fn emit_channel(writer: &mut BitWriter, transform: &Transform, channel_index: usize, optimize_empty: bool, quant: &QuantizerState, is_chroma: bool) {
  if channel_index > 0 {
    writer.put_tag_value(tags::CHANNEL_HEADER, channel_index as u16);
  }

  let top = transform.wavelets.last().expect("pyramid has at least one wavelet");
  emit_lowpass(writer, top.band(wavelet::LL), top.width, top.height, optimize_empty);

  let mut subband_base: u8 = 1;
  for wavelet in transform.wavelets.iter().rev() {
    emit_highpass(writer, wavelet, subband_base, quant, is_chroma);
    subband_base = subband_base.saturating_add(wavelet.bands.len() as u8 - 1);
  }
}

fn build_channel_transform(frames: &[PlanarFrame], channel: usize, cfg: &SampleConfig) -> Transform {
  if frames.len() == 1 {
    transform::build_spatial(frames[0].channel(channel), cfg.num_spatial, cfg.precision)
  } else {
    transform::build_field(frames[0].channel(channel), frames[1].channel(channel), cfg.num_spatial - 1, cfg.field_plus, cfg.precision)
  }
}

fn quantize_transform(transform: &mut Transform, quant: &QuantizerState, is_chroma: bool) {
  let mut subband_base = 1usize;
  for wavelet in transform.wavelets.iter_mut().rev() {
    quantizer::quantize_wavelet(wavelet, quant, subband_base, is_chroma);
    subband_base += wavelet.bands.len() - 1;
  }
}

fn build_and_emit_sample(
  writer: &mut BitWriter,
  frames: &[PlanarFrame],
  cfg: &SampleConfig,
  quant: &QuantizerState,
  global_metadata: &MetadataBlock,
  local_metadata: &MetadataBlock,
  frame_number: u64,
) -> CodecResult<()> {
  if frames.is_empty() {
    return Err(CodecError::InvalidSize);
  }
  let num_channels = frames[0].num_channels();

  let header_tag = if cfg.gop_length == 1 { tags::INTRAFRAME } else { tags::SAMPLE };
  writer.put_tag_value(header_tag, 0);
  writer.put_tag_value(tags::FRAME_NUMBER, (frame_number & 0xFFFF) as u16);
  writer.put_tag_value(tags::PRECISION, cfg.precision as u16);
  writer.put_tag_value(tags::QUALITY, (cfg.quality.0 & 0xFFFF) as u16);
  writer.put_tag_value(tags::CHANNELS_PER_FRAME, num_channels as u16);
  writer.put_tag_value(tags::DIMENSIONS, frames[0].channel(0).width as u16);
  writer.put_tag_value(tags::DIMENSIONS, frames[0].channel(0).height as u16);

  let sample_size_handle = writer.size_tag_push24(tags::SAMPLE_SIZE as u8);

  let global_bytes = global_metadata.bytes();
  let local_bytes = local_metadata.bytes();
  let metadata_handle = writer.size_tag_push(tags::METADATA);
  writer.write_bytes(global_bytes);
  writer.write_bytes(local_bytes);
  writer.size_tag_pop(metadata_handle);

  let channel_size_handles: Vec<_> = (0..num_channels).map(|_| writer.size_tag_push(tags::CHANNEL_SIZE_TABLE)).collect();

  for channel in 0..num_channels {
    let is_chroma = channel > 0;
    let mut transform = build_channel_transform(frames, channel, cfg);
    quantize_transform(&mut transform, quant, is_chroma);

    let before = writer.bytes_written();
    emit_channel(writer, &transform, channel, cfg.optimize_empty_channels, quant, is_chroma);
    let channel_bytes = writer.bytes_written() - before;
    trace!("channel {channel} ({:?}) encoded to {channel_bytes} bytes", transform.shape);
  }

  for handle in channel_size_handles {
    writer.size_tag_pop(handle);
  }

  writer.put_tag_value(tags::GROUP_TRAILER, 0);
  writer.size_tag_pop(sample_size_handle);

  Ok(())
}

/// Header-only / fully-uncompressed pass-through. Used when the quality
/// word's `uncompressed_target_bits` field requests it.
pub fn emit_uncompressed(writer: &mut BitWriter, cfg: &SampleConfig, frame_number: u64, raw_frame: Option<&[u8]>) -> CodecResult<()> {
  let header_tag = if cfg.gop_length == 1 { tags::INTRAFRAME } else { tags::SAMPLE };
  writer.put_tag_value(header_tag, 0);
  writer.put_tag_value(tags::FRAME_NUMBER, (frame_number & 0xFFFF) as u16);
  writer.put_tag_value(tags::PRECISION, cfg.precision as u16);

  if let Some(bytes) = raw_frame {
    let handle = writer.size_tag_push24(tags::CODEC_TAG_UNCOMPRESS as u8);
    writer.write_bytes(bytes);
    writer.size_tag_pop(handle);
  }
  // When `raw_frame` is `None` this is the "header only" variant: only the
  // frame header above is written and the frame's pixels are discarded.

  writer.put_tag_value(tags::GROUP_TRAILER, 0);

  if writer.overflowed() {
    return Err(CodecError::BitstreamOverflow);
  }
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncompressedMode {
  Store,
  HeaderOnly,
}

/// Whether this frame should take the uncompressed pass-through path: a
/// choice seeded by the metadata CRC and gated on the quality word's
/// `uncompressed_target_bits` field (0..=16, out of 16). Bit-exact
/// reproducibility across runs matters more here than true randomness, so
/// this hashes the frame number instead of drawing from an RNG.
pub fn choose_uncompressed_mode(quality: QualityWord, frame_number: u64, metadata_crc: u32) -> Option<UncompressedMode> {
  let target = quality.uncompressed_target_bits();
  if target == 0 {
    return None;
  }
  if target >= 16 {
    return Some(UncompressedMode::Store);
  }
  let mixed = (frame_number as u32).wrapping_mul(2654435761).wrapping_add(metadata_crc);
  let bucket = (mixed >> 28) & 0xF;
  if (bucket as u8) < target {
    Some(UncompressedMode::Store)
  } else {
    None
  }
}
