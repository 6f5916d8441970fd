//! Exporting a palette as hex codes or as a bitmap of colored bands

use crate::{bitmap::PixelBuffer, color, kmeans::KmeansResult};
use palette::{Srgb, Srgba};
use std::io::{self, Write};

/// Width in pixels of the palette bar
pub const PALETTE_BAR_WIDTH: u32 = 512;

/// Height in pixels of the palette bar
pub const PALETTE_BAR_HEIGHT: u32 = 64;

/// Size of the BMP file header plus the BITMAPINFOHEADER
const BMP_HEADER_SIZE: u32 = 14 + 40;

/// `BI_RGB`, no compression
const BMP_COMPRESSION_NONE: u32 = 0;

/// Format a color as `#RRGGBB`
#[must_use]
pub fn hex(color: Srgb<u8>) -> String {
	format!("#{color:X}")
}

/// The sRGB color of each centroid, in order
#[must_use]
pub fn srgb_palette(result: &KmeansResult) -> Vec<Srgb<u8>> {
	result.centroids.iter().map(|&lab| color::lab_to_srgb(lab)).collect()
}

/// The `#RRGGBB` code of each centroid, in order
#[must_use]
pub fn hex_palette(result: &KmeansResult) -> Vec<String> {
	srgb_palette(result).into_iter().map(hex).collect()
}

/// The number of columns each cluster takes up in the palette bar
#[must_use]
pub fn band_widths(result: &KmeansResult) -> Vec<u32> {
	let total = result.total();
	result
		.counts
		.iter()
		.map(|&count| {
			if total == 0 {
				return 0;
			}

			// counts and totals are pixel counts of a downscaled image, well within f32 precision
			#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			{
				let weight = count as f32 / total as f32;
				(weight * PALETTE_BAR_WIDTH as f32).round() as u32
			}
		})
		.collect()
}

/// Render the palette as horizontal bands, one per cluster, with widths proportional to each cluster's count.
///
/// Bands that would run past the right edge are cut off.
/// Columns left over due to rounding stay transparent black.
#[must_use]
pub fn palette_bar(result: &KmeansResult) -> PixelBuffer {
	let mut bar = PixelBuffer::filled(PALETTE_BAR_WIDTH, PALETTE_BAR_HEIGHT, Srgba::new(0, 0, 0, 0));

	let mut x0 = 0;
	for (&lab, width) in result.centroids.iter().zip(band_widths(result)) {
		let color = color::lab_to_srgba(lab);
		let x1 = u32::min(x0 + width, PALETTE_BAR_WIDTH);
		for y in 0..PALETTE_BAR_HEIGHT {
			for x in x0..x1 {
				bar.set_pixel(x, y, color);
			}
		}
		x0 = x1;
	}

	bar
}

/// Write `image` as an uncompressed 32-bit BMP
///
/// # Errors
/// Returns any error from `writer`, or `InvalidInput` if the image is too large for a BMP.
pub fn write_bmp(image: &PixelBuffer, mut writer: impl Write) -> io::Result<()> {
	let too_large = || io::Error::new(io::ErrorKind::InvalidInput, "image is too large for a BMP file");

	let width = i32::try_from(image.width()).map_err(|_| too_large())?;
	let height = i32::try_from(image.height()).map_err(|_| too_large())?;
	let image_size = u32::try_from(image.num_pixels() * 4).map_err(|_| too_large())?;
	let file_size = image_size.checked_add(BMP_HEADER_SIZE).ok_or_else(too_large)?;

	let mut bytes = Vec::with_capacity(file_size as usize);

	// file header
	bytes.extend_from_slice(&0x4D42_u16.to_le_bytes()); // "BM"
	bytes.extend_from_slice(&file_size.to_le_bytes());
	bytes.extend_from_slice(&0_u16.to_le_bytes());
	bytes.extend_from_slice(&0_u16.to_le_bytes());
	bytes.extend_from_slice(&BMP_HEADER_SIZE.to_le_bytes());

	// BITMAPINFOHEADER
	bytes.extend_from_slice(&40_u32.to_le_bytes());
	bytes.extend_from_slice(&width.to_le_bytes());
	bytes.extend_from_slice(&height.to_le_bytes());
	bytes.extend_from_slice(&1_u16.to_le_bytes());
	bytes.extend_from_slice(&32_u16.to_le_bytes());
	bytes.extend_from_slice(&BMP_COMPRESSION_NONE.to_le_bytes());
	bytes.extend_from_slice(&image_size.to_le_bytes());
	bytes.extend_from_slice(&0_i32.to_le_bytes());
	bytes.extend_from_slice(&0_i32.to_le_bytes());
	bytes.extend_from_slice(&0_u32.to_le_bytes());
	bytes.extend_from_slice(&0_u32.to_le_bytes());

	// a positive height means rows are stored bottom to top
	let rows = image.rows().collect::<Vec<_>>();
	for row in rows.into_iter().rev() {
		for px in row.chunks_exact(4) {
			bytes.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
		}
	}

	writer.write_all(&bytes)?;
	writer.flush()
}
