//! Conversions between packed sRGB, linear RGB, CIEXYZ, and CIELAB
//!
//! Each stage of the pipeline has its own color type, so a conversion cannot be skipped or applied twice.
//! The matrices and white point below are fixed to seven significant digits,
//! and exported palettes depend on them matching exactly.

use palette::{LinSrgb, Srgb, Srgba, Xyz};

/// A CIELAB color under the D65 white point
pub type Lab = palette::Lab;

/// D65 white point, X component
const XN: f32 = 0.950470;
/// D65 white point, Y component
const YN: f32 = 1.0;
/// D65 white point, Z component
const ZN: f32 = 1.088830;

/// The break point of the piecewise CIELAB transfer function
const SIGMA: f32 = 6.0 / 29.0;

/// Normalize a packed 8-bit sRGB color to `0.0..=1.0` per channel
#[must_use]
pub fn unpack(srgb: Srgb<u8>) -> Srgb<f32> {
	let inv_255 = 1.0 / 255.0;
	Srgb::new(
		f32::from(srgb.red) * inv_255,
		f32::from(srgb.green) * inv_255,
		f32::from(srgb.blue) * inv_255,
	)
}

/// Quantize a normalized sRGB color to 8 bits per channel with an opaque alpha
#[must_use]
pub fn pack(srgb: Srgb<f32>) -> Srgba<u8> {
	// clamped to 0.0..=1.0 beforehand, so the scaled value fits in a u8
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
	Srgba::new(quantize(srgb.red), quantize(srgb.green), quantize(srgb.blue), u8::MAX)
}

/// The sRGB electro-optical transfer function for a single channel
fn decode_channel(c: f32) -> f32 {
	let c = c.clamp(0.0, 1.0);
	let linear = if c <= 0.04045 {
		c / 12.92
	} else {
		((c + 0.055) / 1.055).powf(2.4)
	};

	debug_assert!((0.0..=1.0).contains(&linear));
	linear
}

/// The inverse of [`decode_channel`]
fn encode_channel(c: f32) -> f32 {
	let c = c.clamp(0.0, 1.0);
	if c <= 0.0031308 {
		12.92 * c
	} else {
		1.055 * c.powf(1.0 / 2.4) - 0.055
	}
}

/// Remove the sRGB gamma
#[must_use]
pub fn srgb_to_linear(srgb: Srgb<f32>) -> LinSrgb<f32> {
	LinSrgb::new(
		decode_channel(srgb.red),
		decode_channel(srgb.green),
		decode_channel(srgb.blue),
	)
}

/// Apply the sRGB gamma, clamping each channel to `0.0..=1.0` first
#[must_use]
pub fn linear_to_srgb(linear: LinSrgb<f32>) -> Srgb<f32> {
	Srgb::new(
		encode_channel(linear.red),
		encode_channel(linear.green),
		encode_channel(linear.blue),
	)
}

/// Linear RGB to CIEXYZ using the sRGB primaries
#[must_use]
pub fn linear_to_xyz(linear: LinSrgb<f32>) -> Xyz {
	let LinSrgb { red: r, green: g, blue: b, .. } = linear;
	Xyz::new(
		0.4124564 * r + 0.3575761 * g + 0.1804375 * b,
		0.2126729 * r + 0.7151522 * g + 0.0721750 * b,
		0.0193339 * r + 0.1191920 * g + 0.9503041 * b,
	)
}

/// CIEXYZ to linear RGB using the sRGB primaries
///
/// The result is not clamped and may fall outside of `0.0..=1.0` for out of gamut colors.
#[must_use]
pub fn xyz_to_linear(xyz: Xyz) -> LinSrgb<f32> {
	let Xyz { x, y, z, .. } = xyz;
	LinSrgb::new(
		3.2404542 * x - 1.5371385 * y - 0.4985314 * z,
		-0.9692660 * x + 1.8760108 * y + 0.0415560 * z,
		0.0556434 * x - 0.2040259 * y + 1.0572252 * z,
	)
}

/// The CIELAB transfer function
fn f(t: f32) -> f32 {
	if t > SIGMA * SIGMA * SIGMA {
		t.cbrt()
	} else {
		t / (3.0 * SIGMA * SIGMA) + 4.0 / 29.0
	}
}

/// The inverse of [`f`]
fn f_inv(t: f32) -> f32 {
	if t > SIGMA {
		t * t * t
	} else {
		3.0 * SIGMA * SIGMA * (t - 4.0 / 29.0)
	}
}

/// CIEXYZ to CIELAB relative to the D65 white point
#[must_use]
pub fn xyz_to_lab(xyz: Xyz) -> Lab {
	let fx = f(xyz.x / XN);
	let fy = f(xyz.y / YN);
	let fz = f(xyz.z / ZN);
	Lab::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// CIELAB to CIEXYZ relative to the D65 white point
#[must_use]
pub fn lab_to_xyz(lab: Lab) -> Xyz {
	let fy = (lab.l + 16.0) / 116.0;
	Xyz::new(
		XN * f_inv(fy + lab.a / 500.0),
		YN * f_inv(fy),
		ZN * f_inv(fy - lab.b / 200.0),
	)
}

/// Convert a packed sRGB color all the way to CIELAB
#[must_use]
pub fn srgb_to_lab(srgb: Srgb<u8>) -> Lab {
	xyz_to_lab(linear_to_xyz(srgb_to_linear(unpack(srgb))))
}

/// Convert a CIELAB color back to a packed, opaque sRGB color
#[must_use]
pub fn lab_to_srgba(lab: Lab) -> Srgba<u8> {
	pack(linear_to_srgb(xyz_to_linear(lab_to_xyz(lab))))
}

/// Convert a CIELAB color back to a packed sRGB color
#[must_use]
pub fn lab_to_srgb(lab: Lab) -> Srgb<u8> {
	lab_to_srgba(lab).color
}

/// Squared euclidean distance in CIELAB
#[must_use]
pub fn squared_distance(x: Lab, y: Lab) -> f32 {
	let dl = x.l - y.l;
	let da = x.a - y.a;
	let db = x.b - y.b;
	dl * dl + da * da + db * db
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use itertools::iproduct;

	#[test]
	fn round_trip_within_one() {
		for (r, g, b) in iproduct!(0..=u8::MAX, 0..=u8::MAX, 0..=u8::MAX) {
			let srgb = Srgb::new(r, g, b);
			let back = lab_to_srgb(srgb_to_lab(srgb));
			assert!(
				r.abs_diff(back.red) <= 1 && g.abs_diff(back.green) <= 1 && b.abs_diff(back.blue) <= 1,
				"{srgb:?} => {back:?}"
			);
		}
	}

	#[test]
	fn primaries_match_reference_lab() {
		let red = srgb_to_lab(Srgb::new(255, 0, 0));
		assert_relative_eq!(red, Lab::new(53.2408, 80.0925, 67.2032), epsilon = 1e-2);

		let green = srgb_to_lab(Srgb::new(0, 255, 0));
		assert_relative_eq!(green, Lab::new(87.7347, -86.1827, 83.1793), epsilon = 1e-2);

		let blue = srgb_to_lab(Srgb::new(0, 0, 255));
		assert_relative_eq!(blue, Lab::new(32.2970, 79.1875, -107.8602), epsilon = 1e-2);
	}

	#[test]
	fn white_and_black_are_neutral() {
		let white = srgb_to_lab(Srgb::new(255, 255, 255));
		assert_relative_eq!(white, Lab::new(100.0, 0.0, 0.0), epsilon = 1e-2);

		let black = srgb_to_lab(Srgb::new(0, 0, 0));
		assert_relative_eq!(black, Lab::new(0.0, 0.0, 0.0), epsilon = 1e-4);
	}

	#[test]
	fn zero_lab_packs_to_opaque_black() {
		assert_eq!(lab_to_srgba(Lab::new(0.0, 0.0, 0.0)), Srgba::new(0, 0, 0, u8::MAX));
	}

	#[test]
	fn out_of_range_values_are_clamped() {
		assert_eq!(pack(Srgb::new(-3.0, 0.5, 7.0)), Srgba::new(0, 128, 255, u8::MAX));
		assert_relative_eq!(decode_channel(2.0), 1.0);
		assert_relative_eq!(decode_channel(-1.0), 0.0);

		// far outside of the sRGB gamut
		let srgb = lab_to_srgb(Lab::new(150.0, -300.0, 300.0));
		assert_eq!(srgb.red, 0);
		assert_eq!(srgb.green, 255);
	}

	#[test]
	fn transfer_functions_are_inverses() {
		for i in 0..=100u8 {
			let t = f32::from(i) / 100.0;
			assert_relative_eq!(f_inv(f(t)), t, epsilon = 1e-6);
			assert_relative_eq!(encode_channel(decode_channel(t)), t, epsilon = 1e-5);
		}
	}
}
