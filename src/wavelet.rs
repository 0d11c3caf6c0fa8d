//! Forward lifting wavelet transforms.
//!
//! Each wavelet owns 1 (temporal) or 4 (spatial) sub-band buffers of 16-bit
//! signed coefficients, a prescale shift and an (initially 1:1) quant
//! divisor per band - the quantizer mutates the latter in place once the
//! transform has finished.

use crate::array2d::Array2D;
use crate::util::*;

/// Which shape of wavelet a node is.
///
/// `Horizontal` is carried for symmetry with the other three kinds - a bare
/// 2-band horizontal-only split with no temporal or vertical component -
/// but no pyramid builder in this crate currently constructs one; it exists
/// so the enum matches the full space of 1D/2D, temporal/non-temporal
/// combinations a node could take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveletKind {
  Spatial,
  HorizontalTemporal,
  Temporal,
  Horizontal,
}

impl WaveletKind {
  pub fn num_bands(self) -> usize {
    match self {
      WaveletKind::Spatial => 4,
      WaveletKind::HorizontalTemporal => 2,
      WaveletKind::Temporal => 2,
      WaveletKind::Horizontal => 2,
    }
  }
}

/// Band order within a 4-band spatial wavelet.
pub const LL: usize = 0;
pub const LH: usize = 1;
pub const HL: usize = 2;
pub const HH: usize = 3;

pub struct Band {
  pub coeffs: Array2D<i16>,
  pub prescale: u8,
  /// The divisor actually applied by the quantizer; 1 until quantization
  /// runs, since it's only known once filtering has picked it.
  pub quant: u16,
  pub scale: u32,
}

impl Band {
  pub fn new(rows: usize, cols: usize, prescale: u8) -> Self {
    Self { coeffs: Array2D::zeroed(rows, cols), prescale, quant: 1, scale: 1 }
  }

  /// A band with no coefficients at all - a temporal wavelet's highpass band
  /// collapses to this when the two source fields are identical.
  pub fn empty() -> Self {
    Self { coeffs: Array2D::zeroed(0, 0), prescale: 0, quant: 1, scale: 1 }
  }

  pub fn is_empty(&self) -> bool {
    self.coeffs.rows() == 0 || self.coeffs.cols() == 0
  }

  pub fn is_all_zero(&self) -> bool {
    if self.is_empty() {
      return true;
    }
    for r in 0..self.coeffs.rows() {
      if self.coeffs[r].iter().any(|&v| v != 0) {
        return false;
      }
    }
    true
  }
}

pub struct Wavelet {
  pub kind: WaveletKind,
  pub level: u32,
  pub width: usize,
  pub height: usize,
  pub bands: Vec<Band>,
}

impl Wavelet {
  pub fn band(&self, idx: usize) -> &Band {
    &self.bands[idx]
  }

  pub fn band_mut(&mut self, idx: usize) -> &mut Band {
    &mut self.bands[idx]
  }
}

// --- 1D lifting core -------------------------------------------------

/// Clamp an index into `[0, len-1]`: samples that fall outside the
/// row/column reuse the nearest edge sample instead of wrapping.
fn reflect(i: isize, len: usize) -> usize {
  clamp(i, 0, len as isize - 1) as usize
}

/// In-place 5-tap forward lifting split of one row/column of length `n`
/// (even, >= 2) into `n/2` lowpass and `n/2` highpass samples.
///
/// This is the reversible CDF 5/3 integer lifting scheme, with the /2 and
/// /4 lifting divisions rounded symmetrically (away from zero on ties)
/// rather than with a plain arithmetic shift, so repeated decompositions
/// don't drift a constant bias into the coefficients.
fn lift_forward_1d(x: &[i32]) -> (Vec<i32>, Vec<i32>) {
  let n = x.len();
  assert!(n >= 2 && n % 2 == 0);
  let half = n / 2;

  let get = |i: isize| -> i32 { x[reflect(i, n)] };

  let mut high = vec![0i32; half];
  for i in 0..half {
    let a = get(2 * i as isize);
    let b = get(2 * i as isize + 2);
    high[i] = get(2 * i as isize + 1) - round2(a + b, 1);
  }

  let mut low = vec![0i32; half];
  for i in 0..half {
    let prev = if i == 0 { high[0] } else { high[i - 1] };
    low[i] = get(2 * i as isize) + round2(prev + high[i], 2);
  }

  (low, high)
}

/// Apply [`lift_forward_1d`] to every row of a plane, producing two
/// half-width planes (lowpass, highpass), both full height.
fn horizontal_split(src: &Array2D<i16>) -> (Array2D<i32>, Array2D<i32>) {
  let rows = src.rows();
  let cols = src.cols();
  let half = cols / 2;

  let mut low = Array2D::<i32>::zeroed(rows, half);
  let mut high = Array2D::<i32>::zeroed(rows, half);

  for r in 0..rows {
    let row: Vec<i32> = (0..cols).map(|c| src[r][c] as i32).collect();
    let (l, h) = lift_forward_1d(&row);
    low[r].copy_from_slice(&l);
    high[r].copy_from_slice(&h);
  }

  (low, high)
}

/// Apply [`lift_forward_1d`] to every column of a plane, producing two
/// half-height planes.
fn vertical_split(src: &Array2D<i32>) -> (Array2D<i32>, Array2D<i32>) {
  let rows = src.rows();
  let cols = src.cols();
  let half = rows / 2;

  let mut low = Array2D::<i32>::zeroed(half, cols);
  let mut high = Array2D::<i32>::zeroed(half, cols);

  for c in 0..cols {
    let col: Vec<i32> = (0..rows).map(|r| src[r][c]).collect();
    let (l, h) = lift_forward_1d(&col);
    for r in 0..half {
      low[r][c] = l[r];
      high[r][c] = h[r];
    }
  }

  (low, high)
}

fn finalize_band(src: Array2D<i32>, prescale: u8) -> Band {
  let rows = src.rows();
  let cols = src.cols();
  let mut coeffs = Array2D::<i16>::zeroed(rows, cols);
  for r in 0..rows {
    for c in 0..cols {
      let shifted = round2(src[r][c], prescale as u32);
      coeffs[r][c] = clamp(shifted, i16::MIN as i32, i16::MAX as i32) as i16;
    }
  }
  Band { coeffs, prescale, quant: 1, scale: 1 }
}

/// Forward level-1 (or successive-level) 2D spatial wavelet: a 5-tap
/// horizontal lift followed by a 5-tap vertical lift, producing LL/LH/HL/HH
/// at half the input's width and height.
///
/// `src` must have even width and height; callers are responsible for the
/// ROUND8 frame-height padding.
pub fn forward_spatial(src: &Array2D<i16>, level: u32, prescale: u8) -> Wavelet {
  let (hlow, hhigh) = horizontal_split(src);
  let (ll, lh) = vertical_split(&hlow);
  let (hl, hh) = vertical_split(&hhigh);

  let width = src.cols() / 2;
  let height = src.rows() / 2;

  // LL is never quantized at level 1; prescale is still applied to keep
  // the coefficient in range, quant is fixed at 1 by finalize_band and
  // the quantizer leaves it alone for level-1 LL.
  let bands = vec![
    finalize_band(ll, prescale),
    finalize_band(lh, prescale),
    finalize_band(hl, prescale),
    finalize_band(hh, prescale),
  ];

  Wavelet { kind: WaveletKind::Spatial, level, width, height, bands }
}

/// Forward spatial decomposition of a single band (used for the successive
/// LL-band decompositions above level 1, and for the decompositions applied
/// to the temporal lowpass/highpass branches in the Field/Field+ pyramids).
pub fn forward_spatial_from_band(band: &Band, level: u32, prescale: u8) -> Wavelet {
  forward_spatial(&band.coeffs, level, prescale)
}

/// A per-field horizontal-temporal level-1 wavelet: a single 5-tap
/// horizontal lift (no vertical pass) producing 2 bands at half width, full
/// height. Only band 0 (horizontal lowpass) feeds the subsequent temporal
/// combine; band 1 stays in the pyramid as this field's own
/// horizontal-detail band and is serialized like any other highpass band.
pub fn forward_horizontal_temporal(src: &Array2D<i16>, prescale: u8) -> Wavelet {
  let (low, high) = horizontal_split(src);
  let width = src.cols() / 2;
  let height = src.rows();
  let bands = vec![finalize_band(low, prescale), finalize_band(high, prescale)];
  Wavelet { kind: WaveletKind::HorizontalTemporal, level: 1, width, height, bands }
}

/// Temporal combine of two wavelets' LL bands: lowpass = a+b, highpass =
/// a-b, with no scaling - the doubled dynamic range is absorbed by later
/// prescale shifts.
pub fn temporal_combine(a: &Wavelet, b: &Wavelet) -> Wavelet {
  let a_ll = &a.band(LL).coeffs;
  let b_ll = &b.band(LL).coeffs;
  assert_eq!(a_ll.rows(), b_ll.rows());
  assert_eq!(a_ll.cols(), b_ll.cols());

  let rows = a_ll.rows();
  let cols = a_ll.cols();

  let mut lowpass = Array2D::<i16>::zeroed(rows, cols);
  let mut highpass = Array2D::<i16>::zeroed(rows, cols);
  for r in 0..rows {
    for c in 0..cols {
      let av = a_ll[r][c] as i32;
      let bv = b_ll[r][c] as i32;
      lowpass[r][c] = clamp(av + bv, i16::MIN as i32, i16::MAX as i32) as i16;
      highpass[r][c] = clamp(av - bv, i16::MIN as i32, i16::MAX as i32) as i16;
    }
  }

  let low_band = Band { coeffs: lowpass, prescale: 0, quant: 1, scale: 1 };
  let high_band = if highpass.rows() > 0 && (0..rows).all(|r| (0..cols).all(|c| highpass[r][c] == 0)) {
    Band::empty()
  } else {
    Band { coeffs: highpass, prescale: 0, quant: 1, scale: 1 }
  };

  Wavelet { kind: WaveletKind::Temporal, level: 1, width: cols, height: rows, bands: vec![low_band, high_band] }
}

/// Prescale shift, fixed per wavelet index and source precision.
/// `is_level1` distinguishes the always-unshifted level-1 transform from
/// the inner levels that pick up a shift at higher precisions.
pub fn prescale_for_precision(precision: u32, is_level1: bool) -> u8 {
  match precision {
    8 => 0,
    10 => {
      if is_level1 {
        0
      } else {
        2
      }
    }
    12 | 16 => {
      if is_level1 {
        0
      } else {
        2
      }
    }
    _ => 0,
  }
}
