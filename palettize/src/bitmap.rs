//! Strided RGBA pixel buffers and nearest neighbor downscaling

use image::RgbaImage;
use palette::{Srgb, Srgba};
use std::{
	error::Error,
	fmt::{self, Display},
};

/// The number of bytes in each pixel (R, G, B, A)
pub const BYTES_PER_PIXEL: usize = 4;

/// The default maximum width or height before an image is downscaled
pub const MAX_DIMENSION: u32 = 100;

/// Error cases for constructing a [`PixelBuffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelBufferError {
	/// The width or height was zero
	ZeroDimension,
	/// The row stride cannot hold `width` pixels
	StrideTooSmall {
		/// The provided stride in bytes
		stride: usize,
		/// The image width in pixels
		width: u32,
	},
	/// The byte buffer is too short for the given dimensions and stride
	BufferTooSmall {
		/// The provided buffer length in bytes
		len: usize,
		/// The minimum buffer length in bytes
		required: usize,
	},
}

impl Display for PixelBufferError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			PixelBufferError::ZeroDimension => write!(f, "The image has a width or height of zero"),
			PixelBufferError::StrideTooSmall { stride, width } => {
				write!(f, "A row stride of {stride} bytes cannot hold {width} pixels")
			},
			PixelBufferError::BufferTooSmall { len, required } => {
				write!(f, "The pixel buffer has {len} bytes but needs at least {required}")
			},
		}
	}
}

impl Error for PixelBufferError {}

/// An 8-bit RGBA image stored row by row, where each row starts `stride` bytes after the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
	/// Raw bytes, four per pixel in R, G, B, A order
	data: Vec<u8>,
	/// Width in pixels
	width: u32,
	/// Height in pixels
	height: u32,
	/// Distance in bytes between the start of consecutive rows
	stride: usize,
}

impl PixelBuffer {
	/// Wrap raw RGBA bytes with the given dimensions and row stride
	///
	/// # Errors
	/// Returns an error if either dimension is zero, the stride is less than `width * 4`,
	/// or `data` is too short to hold the last row.
	pub fn new(data: Vec<u8>, width: u32, height: u32, stride: usize) -> Result<Self, PixelBufferError> {
		if width == 0 || height == 0 {
			return Err(PixelBufferError::ZeroDimension);
		}

		let row_len = width as usize * BYTES_PER_PIXEL;
		if stride < row_len {
			return Err(PixelBufferError::StrideTooSmall { stride, width });
		}

		// the last row does not need to be padded out to the full stride
		let required = stride * (height as usize - 1) + row_len;
		if data.len() < required {
			return Err(PixelBufferError::BufferTooSmall { len: data.len(), required });
		}

		Ok(Self { data, width, height, stride })
	}

	/// Create a tightly packed buffer with every pixel set to `color`
	///
	/// # Panics
	/// Panics if either dimension is zero
	#[must_use]
	pub fn filled(width: u32, height: u32, color: Srgba<u8>) -> Self {
		assert!(width > 0 && height > 0, "dimensions must be non-zero");
		let pixel = [color.red, color.green, color.blue, color.alpha];
		let data = pixel.repeat(width as usize * height as usize);
		Self {
			data,
			width,
			height,
			stride: width as usize * BYTES_PER_PIXEL,
		}
	}

	/// Width in pixels
	#[must_use]
	pub const fn width(&self) -> u32 {
		self.width
	}

	/// Height in pixels
	#[must_use]
	pub const fn height(&self) -> u32 {
		self.height
	}

	/// Distance in bytes between the start of consecutive rows
	#[must_use]
	pub const fn stride(&self) -> usize {
		self.stride
	}

	/// The total number of pixels
	#[must_use]
	pub fn num_pixels(&self) -> usize {
		self.width as usize * self.height as usize
	}

	/// The byte offset of the pixel at `(x, y)`, if it is in bounds
	fn offset(&self, x: u32, y: u32) -> Option<usize> {
		(x < self.width && y < self.height).then(|| y as usize * self.stride + x as usize * BYTES_PER_PIXEL)
	}

	/// The pixel at column `x` and row `y`, or `None` if it is out of bounds
	#[must_use]
	pub fn pixel(&self, x: u32, y: u32) -> Option<Srgba<u8>> {
		let i = self.offset(x, y)?;
		let px = &self.data[i..(i + BYTES_PER_PIXEL)];
		Some(Srgba::new(px[0], px[1], px[2], px[3]))
	}

	/// Overwrite the pixel at column `x` and row `y`
	///
	/// Returns `false` and leaves the buffer untouched if `(x, y)` is out of bounds.
	pub fn set_pixel(&mut self, x: u32, y: u32, color: Srgba<u8>) -> bool {
		match self.offset(x, y) {
			Some(i) => {
				self.data[i..(i + BYTES_PER_PIXEL)].copy_from_slice(&[color.red, color.green, color.blue, color.alpha]);
				true
			},
			None => false,
		}
	}

	/// The bytes of each row, excluding any padding past `width * 4`
	pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
		let row_len = self.width as usize * BYTES_PER_PIXEL;
		(0..self.height as usize).map(move |y| {
			let start = y * self.stride;
			&self.data[start..(start + row_len)]
		})
	}

	/// The color of every pixel in row-major order, ignoring alpha
	pub fn pixels(&self) -> impl Iterator<Item = Srgb<u8>> + '_ {
		self.rows()
			.flat_map(|row| row.chunks_exact(BYTES_PER_PIXEL))
			.map(|px| Srgb::new(px[0], px[1], px[2]))
	}

	/// Create a smaller copy using nearest neighbor sampling
	/// if the width or height is greater than `max_dimension`.
	///
	/// The larger dimension becomes `max_dimension` and the aspect ratio is preserved.
	/// Returns `None` if no resize is necessary or `max_dimension` is zero.
	#[must_use]
	pub fn downscale(&self, max_dimension: u32) -> Option<Self> {
		if max_dimension == 0 || (self.width <= max_dimension && self.height <= max_dimension) {
			return None;
		}

		// (u32 as f32) is only inexact above 2^24, far past any sensible image dimension
		#[allow(clippy::cast_precision_loss)]
		let resize_factor = max_dimension as f32 / self.width.max(self.height) as f32;

		// multiplying by a positive factor < 1, and each dimension is kept at 1 or more
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
		let scale = |extent: u32| ((extent as f32 * resize_factor).round() as u32).max(1);

		let width = scale(self.width);
		let height = scale(self.height);
		let mut resized = Self::filled(width, height, Srgba::new(0, 0, 0, 0));

		for y in 0..height {
			let sample_y = nearest_sample(y, height, self.height);
			for x in 0..width {
				let sample_x = nearest_sample(x, width, self.width);
				if let Some(color) = self.pixel(sample_x, sample_y) {
					resized.set_pixel(x, y, color);
				}
			}
		}

		Some(resized)
	}
}

/// Map destination index `i` of `dest_extent` onto the source extent using normalized coordinates
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn nearest_sample(i: u32, dest_extent: u32, source_extent: u32) -> u32 {
	if dest_extent <= 1 {
		return 0;
	}

	let u = i as f32 / (dest_extent - 1) as f32;
	let sample = (u * (source_extent - 1) as f32).round() as u32;
	sample.min(source_extent - 1)
}

impl From<RgbaImage> for PixelBuffer {
	fn from(image: RgbaImage) -> Self {
		let (width, height) = image.dimensions();
		Self {
			data: image.into_raw(),
			width,
			height,
			stride: width as usize * BYTES_PER_PIXEL,
		}
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	fn gradient(width: u32, height: u32) -> PixelBuffer {
		#[allow(clippy::cast_possible_truncation)]
		let image = RgbaImage::from_fn(width, height, |x, y| image::Rgba([x as u8, y as u8, 0, u8::MAX]));
		PixelBuffer::from(image)
	}

	#[test]
	fn rejects_invalid_layouts() {
		assert_eq!(PixelBuffer::new(vec![0; 16], 0, 4, 0), Err(PixelBufferError::ZeroDimension));
		assert_eq!(
			PixelBuffer::new(vec![0; 16], 2, 2, 4),
			Err(PixelBufferError::StrideTooSmall { stride: 4, width: 2 })
		);
		assert_eq!(
			PixelBuffer::new(vec![0; 15], 2, 2, 8),
			Err(PixelBufferError::BufferTooSmall { len: 15, required: 16 })
		);
	}

	#[test]
	fn stride_padding_is_skipped() {
		// 2x2 image with 4 bytes of padding after each row, the last row unpadded
		let data = vec![
			1, 2, 3, 255, 4, 5, 6, 255, 99, 99, 99, 99, //
			7, 8, 9, 255, 10, 11, 12, 255,
		];
		let buffer = PixelBuffer::new(data, 2, 2, 12).unwrap();

		assert_eq!(buffer.pixel(1, 1), Some(Srgba::new(10, 11, 12, 255)));
		assert_eq!(buffer.pixel(2, 0), None);
		assert_eq!(buffer.pixel(0, 2), None);

		let pixels = buffer.pixels().collect::<Vec<_>>();
		assert_eq!(
			pixels,
			vec![Srgb::new(1, 2, 3), Srgb::new(4, 5, 6), Srgb::new(7, 8, 9), Srgb::new(10, 11, 12)]
		);
	}

	#[test]
	fn set_pixel_is_bounds_checked() {
		let mut buffer = PixelBuffer::filled(3, 2, Srgba::new(0, 0, 0, 255));
		assert!(buffer.set_pixel(2, 1, Srgba::new(1, 2, 3, 4)));
		assert!(!buffer.set_pixel(3, 1, Srgba::new(1, 2, 3, 4)));
		assert_eq!(buffer.pixel(2, 1), Some(Srgba::new(1, 2, 3, 4)));
	}

	#[test]
	fn small_images_are_not_downscaled() {
		assert!(gradient(100, 40).downscale(MAX_DIMENSION).is_none());
		assert!(gradient(1, 1).downscale(MAX_DIMENSION).is_none());
		assert!(gradient(300, 300).downscale(0).is_none());
	}

	#[test]
	fn downscale_preserves_aspect_ratio() {
		let resized = gradient(400, 200).downscale(MAX_DIMENSION).unwrap();
		assert_eq!((resized.width(), resized.height()), (100, 50));

		let resized = gradient(150, 301).downscale(MAX_DIMENSION).unwrap();
		assert_eq!((resized.width(), resized.height()), (50, 100));
	}

	#[test]
	fn downscale_samples_corners() {
		let source = gradient(250, 120);
		let resized = source.downscale(MAX_DIMENSION).unwrap();
		let (w, h) = (resized.width(), resized.height());

		assert_eq!(resized.pixel(0, 0), source.pixel(0, 0));
		assert_eq!(resized.pixel(w - 1, 0), source.pixel(249, 0));
		assert_eq!(resized.pixel(0, h - 1), source.pixel(0, 119));
		assert_eq!(resized.pixel(w - 1, h - 1), source.pixel(249, 119));
	}

	#[test]
	fn thin_images_keep_one_pixel() {
		let resized = gradient(1000, 1).downscale(MAX_DIMENSION).unwrap();
		assert_eq!((resized.width(), resized.height()), (100, 1));
		assert_eq!(resized.pixel(99, 0), gradient(1000, 1).pixel(999, 0));
	}
}
