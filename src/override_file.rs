//! Runtime override side-channel.
//!
//! `{LUTs}/{UserDB}/defaults.colr` and `{Override}/override.colr` are each a
//! bare TLV stream in the metadata format; polling and locating those paths
//! is platform-affinity glue out of this crate's scope, so this module only
//! covers parsing an already-read buffer into the fields it updates on the
//! encoder.

use crate::format::{ColorspaceRgb, ColorspaceYuv};
use crate::metadata;

const TAG_COLOR_SPACE_YUV: metadata::FourCc = *b"CSPY";
const TAG_COLOR_SPACE_RGB: metadata::FourCc = *b"CSPR";
const TAG_PRESENTATION_DIMENSIONS: metadata::FourCc = *b"PDIM";
const TAG_STEREO_CHANNELS: metadata::FourCc = *b"STER";
const TAG_BAYER_FORMAT: metadata::FourCc = *b"BAYR";
const TAG_CURVE_PRESET: metadata::FourCc = *b"CURV";

/// Fields an override file may update before the next frame's quantizer
/// setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideFields {
  pub colorspace_yuv: Option<ColorspaceYuv>,
  pub colorspace_rgb: Option<ColorspaceRgb>,
  pub presentation_width: Option<u16>,
  pub presentation_height: Option<u16>,
  pub stereo_channels: Option<u8>,
  pub bayer_format: Option<u8>,
  pub curve_preset: Option<u8>,
}

/// Parse an override TLV buffer, picking out the fields this crate acts on.
/// Tags it doesn't recognize are silently skipped: the override format is
/// forward-compatible by design.
pub fn parse(bytes: &[u8]) -> OverrideFields {
  let mut fields = OverrideFields::default();
  for (tag, _ty, payload) in metadata::parse_entries(bytes) {
    match tag {
      TAG_COLOR_SPACE_YUV if !payload.is_empty() => {
        fields.colorspace_yuv = Some(if payload[0] == 0 { ColorspaceYuv::Bt601 } else { ColorspaceYuv::Bt709 });
      }
      TAG_COLOR_SPACE_RGB if !payload.is_empty() => {
        fields.colorspace_rgb = Some(if payload[0] == 0 { ColorspaceRgb::CgRgb } else { ColorspaceRgb::VsRgb });
      }
      TAG_PRESENTATION_DIMENSIONS if payload.len() >= 4 => {
        fields.presentation_width = Some(u16::from_be_bytes([payload[0], payload[1]]));
        fields.presentation_height = Some(u16::from_be_bytes([payload[2], payload[3]]));
      }
      TAG_STEREO_CHANNELS if !payload.is_empty() => {
        fields.stereo_channels = Some(payload[0]);
      }
      TAG_BAYER_FORMAT if !payload.is_empty() => {
        fields.bayer_format = Some(payload[0]);
      }
      TAG_CURVE_PRESET if !payload.is_empty() => {
        fields.curve_preset = Some(payload[0]);
      }
      _ => {}
    }
  }
  fields
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tlv_entry(tag: metadata::FourCc, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tag);
    out.push(b'L');
    let len = payload.len();
    out.push(((len >> 16) & 0xFF) as u8);
    out.push(((len >> 8) & 0xFF) as u8);
    out.push((len & 0xFF) as u8);
    out.extend_from_slice(payload);
    while out.len() % 4 != 0 {
      out.push(0);
    }
    out
  }

  #[test]
  fn parses_recognized_tags_and_skips_unknown() {
    let mut bytes = tlv_entry(*b"????", &[1, 2, 3, 4]);
    bytes.extend(tlv_entry(TAG_COLOR_SPACE_YUV, &[1]));
    bytes.extend(tlv_entry(TAG_PRESENTATION_DIMENSIONS, &1920u16.to_be_bytes().into_iter().chain(1080u16.to_be_bytes()).collect::<Vec<_>>()));

    let fields = parse(&bytes);
    assert_eq!(fields.colorspace_yuv, Some(ColorspaceYuv::Bt709));
    assert_eq!(fields.presentation_width, Some(1920));
    assert_eq!(fields.presentation_height, Some(1080));
  }

  #[test]
  fn parses_bayer_format_and_curve_preset() {
    let mut bytes = tlv_entry(TAG_BAYER_FORMAT, &[3]);
    bytes.extend(tlv_entry(TAG_CURVE_PRESET, &[7]));

    let fields = parse(&bytes);
    assert_eq!(fields.bayer_format, Some(3));
    assert_eq!(fields.curve_preset, Some(7));
  }
}
