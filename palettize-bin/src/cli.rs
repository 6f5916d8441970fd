//! Specifies the CLI and handles arg parsing

use clap::{Parser, ValueEnum};
use palettize::SortType;
use std::path::PathBuf;

/// Supported output formats for the final colors
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum FormatOutput {
	/// Write a bar of the colors, sized by weight, to the destination bitmap
	Bmp,
	/// Print sRGB hexcodes
	Hex,
	/// Print sRGB (r,g,b) triples
	Rgb,
	/// Print whitespace with a true color background
	Swatch,
}

/// Ways to colorize the output text
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ColorizeOutput {
	/// Foreground
	Fg,
	/// Background
	Bg,
}

/// Generate a color palette for an image by performing k-means clustering in the CIELAB color space.
#[derive(Parser)]
#[command(version)]
pub struct Options {
	/// The path to the input image
	pub image: PathBuf,

	/// The number of colors to find
	///
	/// Values outside of [1, 64] are clamped into that range.
	#[arg(default_value = "5", value_parser = parse_cluster_count, allow_negative_numbers = true)]
	pub cluster_count: u8,

	/// The seed value used for picking the starting pixel of each cluster
	///
	/// Defaults to the current time in seconds.
	pub seed: Option<u32>,

	/// The order of the colors: weight, red, green, or blue
	///
	/// weight puts the most common colors first,
	/// while the others put the colors closest to pure red, green, or blue first.
	/// Unrecognized values fall back to weight.
	#[arg(default_value = "weight", value_parser = parse_sort_type)]
	pub sort: SortType,

	/// The path of the bitmap to write when the output format is bmp
	#[arg(default_value = "palette.bmp")]
	pub dest: PathBuf,

	/// The output format for the colors
	#[arg(short, long, default_value = "bmp")]
	pub output: FormatOutput,

	/// Color the foreground or background for each printed color
	#[arg(short, long)]
	pub colorize: Option<ColorizeOutput>,

	/// The maximum width or height of the image before it is downscaled
	///
	/// A value of 0 disables downscaling.
	#[arg(long, default_value_t = palettize::MAX_DIMENSION)]
	pub max_dimension: u32,

	/// The maximum number of k-means iterations
	///
	/// By default, k-means runs until no pixel changes cluster.
	/// You can use the --verbose option to see how many iterations were needed.
	#[arg(short = 'i', long, default_value_t = u32::MAX)]
	pub max_iter: u32,

	/// Print additional information, such as the time taken by each step
	#[arg(long)]
	pub verbose: bool,

	/// Only check that the image can be read and print its dimensions
	#[arg(long)]
	pub check: bool,
}

/// Parse an integer cluster count and clamp it to the supported range
pub fn parse_cluster_count(s: &str) -> Result<u8, String> {
	let count: i64 = s.trim().parse().map_err(|e| format!("{e}"))?;
	Ok(palettize::clamp_cluster_count(count))
}

/// Parse a sort type by name, falling back to weight for unknown names
#[allow(clippy::unnecessary_wraps)]
pub fn parse_sort_type(s: &str) -> Result<SortType, String> {
	Ok(SortType::from_name(s.trim()))
}
