//! Per-channel wavelet pyramids.
//!
//! A [`Transform`] is an ordered list of [`Wavelet`] nodes. Which shape gets
//! built - `Spatial`, `Field`, or `Field+` - is a property of the GOP length
//! and `progressive` flag the caller passed to the encoder, not of this
//! module; callers pick the right `build_*` function.

use crate::format::Plane;
use crate::util::round_up;
use crate::wavelet::{self, Band, Wavelet, WaveletKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidShape {
  /// Intra, GOP == 1.
  Spatial,
  /// Interlaced, GOP == 2, no extra decomposition of the temporal highpass.
  Field,
  /// As `Field`, plus one spatial decomposition of the temporal highpass.
  FieldPlus,
}

/// One channel's wavelet pyramid plus a scratch row buffer sized to hold one
/// full-width image row band plus prescale staging.
pub struct Transform {
  pub shape: PyramidShape,
  pub wavelets: Vec<Wavelet>,
  scratch: Vec<i32>,
}

impl Transform {
  fn with_scratch(shape: PyramidShape, wavelets: Vec<Wavelet>, width: usize) -> Self {
    // ~16 rows worth of staging (kept in i32 units here since that's the
    // widest intermediate the lifting filters use).
    let scratch = vec![0i32; 16 * width];
    Self { shape, wavelets, scratch }
  }

  pub fn scratch_len(&self) -> usize {
    self.scratch.len()
  }

  pub fn wavelet(&self, idx: usize) -> &Wavelet {
    &self.wavelets[idx]
  }

  /// Round up a channel's natural height to a multiple of 8 - padding rows
  /// take the channel's neutral value so the lifting filters never see
  /// discontinuities from real image content.
  pub fn round8_height(height: usize) -> usize {
    round_up(height, 8)
  }
}

/// Build the `Spatial` (intra, GOP=1) pyramid: a level-1 2D wavelet followed
/// by `num_spatial - 1` successive decompositions of the running LL band.
pub fn build_spatial(plane: &Plane, num_spatial: u32, precision: u32) -> Transform {
  assert!(num_spatial >= 1);
  let mut wavelets = Vec::with_capacity(num_spatial as usize);

  let prescale0 = wavelet::prescale_for_precision(precision, true);
  wavelets.push(wavelet::forward_spatial(&plane.data, 1, prescale0));

  for level in 2..=num_spatial {
    let prescale = wavelet::prescale_for_precision(precision, false);
    let prev_ll = wavelets.last().unwrap().band(wavelet::LL);
    wavelets.push(wavelet::forward_spatial_from_band(prev_ll, level, prescale));
  }

  Transform::with_scratch(PyramidShape::Spatial, wavelets, plane.width)
}

/// Build a `Field`/`Field+` (interlaced, GOP=2) pyramid from the two frames
/// of one GOP for a single channel.
///
/// `num_lowpass_levels` is the number of successive spatial decompositions
/// applied to the temporal-lowpass branch; `plus` selects whether the
/// temporal-highpass branch also gets one spatial
/// decomposition (`Field+`) or is left as a bare 2-band temporal wavelet
/// (`Field`).
pub fn build_field(field0: &Plane, field1: &Plane, num_lowpass_levels: u32, plus: bool, precision: u32) -> Transform {
  assert_eq!(field0.width, field1.width);
  assert_eq!(field0.height, field1.height);

  let prescale0 = wavelet::prescale_for_precision(precision, true);
  let w0 = wavelet::forward_horizontal_temporal(&field0.data, prescale0);
  let w1 = wavelet::forward_horizontal_temporal(&field1.data, prescale0);
  let temporal = wavelet::temporal_combine(&w0, &w1);

  let mut wavelets = vec![w0, w1, temporal];

  if plus && !wavelets[2].band(1).is_empty() {
    let prescale = wavelet::prescale_for_precision(precision, false);
    let highpass_band = wavelets[2].band(1);
    wavelets.push(wavelet::forward_spatial_from_band(highpass_band, 1, prescale));
  }

  for level in 1..=num_lowpass_levels {
    let prescale = wavelet::prescale_for_precision(precision, false);
    let lowpass_source: &Band = if level == 1 { wavelets[2].band(0) } else { wavelets.last().unwrap().band(wavelet::LL) };
    let decomposed = wavelet::forward_spatial_from_band(lowpass_source, level, prescale);
    wavelets.push(decomposed);
  }

  let shape = if plus { PyramidShape::FieldPlus } else { PyramidShape::Field };
  Transform::with_scratch(shape, wavelets, field0.width)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::array2d::Array2D;
  use crate::format::ChannelKind;

  fn flat_plane(width: usize, height: usize, value: i16) -> Plane {
    let mut data = Array2D::<i16>::zeroed(height, width);
    data.fill_with(|_, _| value);
    Plane { width, height, kind: ChannelKind::Luma, data }
  }

  #[test]
  fn spatial_pyramid_has_requested_levels() {
    let plane = flat_plane(32, 32, 100);
    let t = build_spatial(&plane, 3, 8);
    assert_eq!(t.wavelets.len(), 3);
    assert_eq!(t.wavelet(0).width, 16);
    assert_eq!(t.wavelet(1).width, 8);
    assert_eq!(t.wavelet(2).width, 4);
  }

  #[test]
  fn field_pyramid_with_identical_fields_skips_highpass_decomposition() {
    let f0 = flat_plane(64, 64, 50);
    let f1 = flat_plane(64, 64, 50);
    let t = build_field(&f0, &f1, 2, true, 8);
    // w0, w1, temporal, + 2 lowpass decompositions = 5 nodes; the highpass
    // decomposition is skipped because the two fields are identical, so the
    // temporal highpass band is empty (nothing to decompose).
    assert_eq!(t.wavelets.len(), 5);
    assert_eq!(t.shape, PyramidShape::FieldPlus);
    assert!(t.wavelet(2).band(1).is_empty());
  }

  #[test]
  fn field_plus_pyramid_decomposes_nonempty_highpass() {
    let f0 = flat_plane(64, 64, 50);
    let mut f1 = flat_plane(64, 64, 40);
    f1.data[0][0] = 41;
    let t = build_field(&f0, &f1, 1, true, 8);
    // w0, w1, temporal, highpass decomposition, + 1 lowpass decomposition.
    assert_eq!(t.wavelets.len(), 5);
    assert_eq!(t.wavelet(3).bands.len(), 4);
  }

  #[test]
  fn round8_height_pads_up() {
    assert_eq!(Transform::round8_height(60), 64);
    assert_eq!(Transform::round8_height(64), 64);
  }
}
