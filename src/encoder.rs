//! The top-level encoder: owns configuration, the pyramid/metadata state
//! (via [`SampleAssembler`]), and the sticky error policy.

use log::{error, info};

use crate::bitstream::BitWriter;
use crate::error::{CodecError, CodecResult};
use crate::format::{ColorspaceRgb, ColorspaceYuv, InputPixelFormat, PlanarFrame, QualityWord};
use crate::override_file::{self, OverrideFields};
use crate::quantizer::CustomQuantTable;
use crate::sample::{self, SampleAssembler, SampleConfig, UncompressedMode};
use crate::tags;

/// Encoder configuration, set at init and (for a few fields) mutable
/// afterward via override files.
pub struct EncoderConfig {
  pub gop_length: u32,
  pub num_spatial: u32,
  pub encoded_width: usize,
  pub encoded_height: usize,
  pub display_height: usize,
  pub input_format: InputPixelFormat,
  pub colorspace_yuv: ColorspaceYuv,
  pub colorspace_rgb: ColorspaceRgb,
  pub progressive: bool,
  pub field_plus: bool,
  pub fixed_quality: QualityWord,
  pub fixed_bitrate: u32,
  pub frame_rate: u32,
  pub custom_quant: Option<CustomQuantTable>,
  pub bayer_format: Option<u8>,
  pub curve_preset: Option<u8>,
}

/// Width above which the encoder reports `INVALID_FORMAT`.
const MAX_WIDTH: usize = 32768;

impl EncoderConfig {
  fn validate(&self) -> CodecResult<()> {
    if self.encoded_width == 0 || self.encoded_width > MAX_WIDTH || self.encoded_height == 0 {
      return Err(CodecError::InvalidFormat);
    }
    if !matches!(self.gop_length, 1 | 2) {
      return Err(CodecError::InvalidSize);
    }
    if !matches!(self.num_spatial, 2 | 3) {
      return Err(CodecError::InvalidSize);
    }
    Ok(())
  }
}

/// The encoder core.
///
/// Exclusively owns the transform pyramid, scratch buffers, metadata
/// blocks, and quantizer (all via [`SampleAssembler`]). The caller owns the
/// input pixels and the output byte buffer.
pub struct Encoder {
  cfg: EncoderConfig,
  assembler: SampleAssembler,
  error: Option<CodecError>,
  metadata_crc: u32,
}

impl Encoder {
  pub fn new(cfg: EncoderConfig) -> CodecResult<Self> {
    cfg.validate()?;

    let sample_cfg = SampleConfig {
      gop_length: cfg.gop_length,
      num_spatial: cfg.num_spatial,
      precision: cfg.input_format.precision(),
      progressive: cfg.progressive,
      field_plus: cfg.field_plus,
      quality: cfg.fixed_quality,
      optimize_empty_channels: cfg.fixed_quality.optimize_empty_channels(),
      fixed_bitrate: cfg.fixed_bitrate,
      frame_rate: cfg.frame_rate,
    };
    let mut assembler = SampleAssembler::new(sample_cfg);

    if let Some(custom) = &cfg.custom_quant {
      if !assembler.quantizer.apply_custom_quant(custom) {
        error!("custom quant table rejected: magic mismatch");
      }
    }

    info!(
      "encoder initialized: {}x{} gop={} num_spatial={} precision={}",
      cfg.encoded_width,
      cfg.encoded_height,
      cfg.gop_length,
      cfg.num_spatial,
      cfg.input_format.precision()
    );

    Ok(Self { cfg, assembler, error: None, metadata_crc: 0 })
  }

  pub fn last_error(&self) -> Option<CodecError> {
    self.error
  }

  /// The caller must call this before retrying after an error: errors are
  /// sticky until explicitly cleared.
  pub fn reset_error(&mut self) {
    self.error = None;
  }

  fn validate_frame(&self, frame: &PlanarFrame) -> CodecResult<()> {
    let luma = frame.channel(0);
    if luma.width != self.cfg.encoded_width || luma.height != self.cfg.encoded_height {
      return Err(CodecError::InvalidSize);
    }
    Ok(())
  }

  /// `EncodeSample`: feed one frame. Returns the number of bytes written to
  /// `out` - `0` while a GOP is still accumulating frames, or the full
  /// sample size once a group (or single intra frame) completes.
  pub fn encode_sample(&mut self, frame: PlanarFrame, out: &mut [u8]) -> CodecResult<usize> {
    if let Some(e) = self.error {
      return Err(e);
    }
    if let Err(e) = self.validate_frame(&frame) {
      self.error = Some(e);
      return Err(e);
    }

    if let Some(mode) = sample::choose_uncompressed_mode(self.cfg.fixed_quality, self.assembler.frame_number(), self.metadata_crc) {
      return self.encode_uncompressed(mode, &frame, out);
    }

    let ready = self.assembler.push_frame(frame);
    if !ready {
      return Ok(0);
    }

    let mut writer = BitWriter::new(out);
    match self.assembler.emit(&mut writer) {
      Ok(()) => Ok(writer.flush()),
      Err(e) => {
        self.error = Some(e);
        Err(e)
      }
    }
  }

  fn encode_uncompressed(&mut self, mode: UncompressedMode, frame: &PlanarFrame, out: &mut [u8]) -> CodecResult<usize> {
    let sample_cfg = SampleConfig {
      gop_length: self.cfg.gop_length,
      num_spatial: self.cfg.num_spatial,
      precision: self.cfg.input_format.precision(),
      progressive: self.cfg.progressive,
      field_plus: self.cfg.field_plus,
      quality: self.cfg.fixed_quality,
      optimize_empty_channels: self.cfg.fixed_quality.optimize_empty_channels(),
      fixed_bitrate: self.cfg.fixed_bitrate,
      frame_rate: self.cfg.frame_rate,
    };
    let packed = match mode {
      UncompressedMode::Store => Some(frame.pack_be_words()),
      UncompressedMode::HeaderOnly => None,
    };
    let raw_frame = packed.as_deref();
    let mut writer = BitWriter::new(out);
    match sample::emit_uncompressed(&mut writer, &sample_cfg, self.assembler.frame_number(), raw_frame) {
      Ok(()) => Ok(writer.flush()),
      Err(e) => {
        self.error = Some(e);
        Err(e)
      }
    }
  }

  /// Merge an override-file TLV buffer into the live configuration, applied
  /// before the next frame's quantizer setup.
  pub fn apply_override(&mut self, bytes: &[u8]) {
    let fields: OverrideFields = override_file::parse(bytes);
    if let Some(cs) = fields.colorspace_yuv {
      self.cfg.colorspace_yuv = cs;
    }
    if let Some(cs) = fields.colorspace_rgb {
      self.cfg.colorspace_rgb = cs;
    }
    if let Some(v) = fields.bayer_format {
      self.cfg.bayer_format = Some(v);
    }
    if let Some(v) = fields.curve_preset {
      self.cfg.curve_preset = Some(v);
    }
  }

  pub fn add_global_metadata(&mut self, tag: [u8; 4], ty: u8, payload: &[u8]) -> bool {
    self.assembler.global_metadata.add(tag, ty, payload)
  }

  pub fn add_local_metadata(&mut self, tag: [u8; 4], ty: u8, payload: &[u8]) -> bool {
    self.assembler.local_metadata.add(tag, ty, payload)
  }

  pub const fn sample_size_tag() -> u16 {
    tags::SAMPLE_SIZE
  }
}
