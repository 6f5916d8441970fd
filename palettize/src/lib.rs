//! Generate a color palette for an image by performing k-means clustering in the CIELAB color space.
//!
//! # Examples
//!
//! ## Read an image file and get 5 colors, most common first.
//!
//! ```no_run
//! use palettize::{PixelBuffer, SortType};
//!
//! let image = image::open("some image").unwrap().into_rgba8();
//! let pixels = PixelBuffer::from(image);
//! let pixels = pixels.downscale(palettize::MAX_DIMENSION).unwrap_or(pixels);
//!
//! let mut result = palettize::from_pixels(&pixels, 5, u32::MAX, 42);
//! result.sort(SortType::Weight);
//!
//! for hex in palettize::hex_palette(&result) {
//!     println!("{hex}");
//! }
//! ```
//!
//! ## Run k-means multiple times on the same image.
//!
//! ```no_run
//! # let pixels = palettize::PixelBuffer::from(image::open("some image").unwrap().into_rgba8());
//! let lab = palettize::LabPixels::from_pixels(&pixels);
//!
//! let five = palettize::from_lab_pixels(&lab, 5, u32::MAX, 0);
//! let eight = palettize::from_lab_pixels(&lab, 8, u32::MAX, 0);
//! ```
//!
//! # Arguments
//!
//! ## Cluster Count
//!
//! The number of colors to find, clamped to `1..=64`.
//!
//! Every cluster is part of the result, even ones that ended up with no pixels.
//! Such clusters have a centroid of `Lab(0, 0, 0)`, which converts to black.
//!
//! ## Max Iterations
//!
//! The maximum number of times the centroids are recomputed.
//!
//! k-means normally stops once a pass leaves every pixel with the same cluster as the previous pass.
//! There is no guarantee this happens quickly for every image, so this is a safety net.
//! Use `u32::MAX` to only stop on convergence, and check [`KmeansResult::converged`] to see how a run ended.
//!
//! ## Seed
//!
//! The value used to seed the [`XorShift32`] generator which picks the starting pixel of each cluster.
//! The same image, cluster count, and seed always give the same result.
//! Note that a seed of `0` starts every cluster on the top left pixel.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::excessive_precision)]

pub mod color;

mod bitmap;
pub use bitmap::{PixelBuffer, PixelBufferError, MAX_DIMENSION};

mod random;
pub use random::XorShift32;

mod kmeans;
pub use kmeans::{clamp_cluster_count, KmeansResult, LabPixels, MAX_CLUSTERS, MIN_CLUSTERS};

mod sort;
pub use sort::SortType;

mod output;
pub use output::{band_widths, hex, hex_palette, palette_bar, srgb_palette, write_bmp, PALETTE_BAR_HEIGHT, PALETTE_BAR_WIDTH};

/// Runs k-means on the pixels of an image.
///
/// See the crate documentation for examples and information on each argument.
#[must_use]
pub fn from_pixels(pixels: &PixelBuffer, cluster_count: u8, max_iter: u32, seed: u32) -> KmeansResult {
	from_lab_pixels(&LabPixels::from_pixels(pixels), cluster_count, max_iter, seed)
}

/// Runs k-means on [`LabPixels`] from [`LabPixels::from_pixels`]
///
/// Converting pixels to CIELAB is expensive,
/// so use this function if you need to run k-means multiple times on the same image but with different arguments.
///
/// See the crate documentation for examples and information on each argument.
#[must_use]
pub fn from_lab_pixels(lab: &LabPixels, cluster_count: u8, max_iter: u32, seed: u32) -> KmeansResult {
	kmeans::run(lab, cluster_count, max_iter, seed)
}
