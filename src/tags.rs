//! Bitstream tag constants.
//!
//! High bit clear means mandatory, high bit set means optional/skippable;
//! the values below follow that split but are otherwise assigned in plain
//! sequence, since only the tag names and mandatory/optional status carry
//! any format meaning.

macro_rules! tags {
  ($( $(#[$meta:meta])* $name:ident = $val:expr; )*) => {
    $( $(#[$meta])* pub const $name: u16 = $val; )*
  };
}

tags! {
  SAMPLE = 0x0001;
  INTRAFRAME = 0x0002;
  SAMPLE_SIZE = 0x0003;
  FRAME_NUMBER = 0x0004;
  PRECISION = 0x0005;
  ENCODED_FORMAT = 0x0006;
  CHANNELS_PER_FRAME = 0x0007;
  SUBBAND_COUNT = 0x0008;
  CHANNEL_SIZE_TABLE = 0x0009;
  METADATA = 0x000A;
  FREESPACE = 0x000B;
  HIGHPASS_HEADER = 0x000C;
  HIGHPASS_TRAILER = 0x000D;
  BAND_HEADER = 0x000E;
  BAND_TRAILER = 0x000F;
  BAND_END_CODE = 0x0010;
  BAND_MIDPOINT = 0x0011;
  PEAK_TABLE = 0x0012;
  PEAK_LEVEL = 0x0013;
  PEAK_TABLE_OFFSET_L = 0x0014;
  PEAK_TABLE_OFFSET_H = 0x0015;
  ENCODED_CHANNELS = 0x0016;
  ENCODED_CHANNEL_NUMBER = 0x0017;
  CHANNEL_HEADER = 0x0018;
  GROUP_TRAILER = 0x0019;
  COLOR_SPACE = 0x001A;
  QUALITY = 0x001B;
  DIMENSIONS = 0x001C;
  LOWPASS_HEADER = 0x001D;

  /// Carries the 24-bit size of the uncompressed payload, written with
  /// [`crate::bitstream::BitWriter::put_tag_value24`].
  CODEC_TAG_UNCOMPRESS = 0x8001;

  /// Empty-band sentinel subband index.
  EMPTY_SUBBAND_INDEX = 0xFF;
}

/// Lowpass-constant-shortcut sentinel word.
pub const LOWPASS_CONSTANT_SENTINEL: u32 = 0xFFFF_FFFF;
