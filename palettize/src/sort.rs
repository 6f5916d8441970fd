//! Ordering of the final clusters

use crate::{
	color::{self, Lab},
	kmeans::KmeansResult,
};

/// Orders for the final clusters
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SortType {
	/// Descending number of pixels
	#[default]
	Weight,
	/// Ascending distance to pure red
	Red,
	/// Ascending distance to pure green
	Green,
	/// Ascending distance to pure blue
	Blue,
}

impl SortType {
	/// Look up a sort type by name, ignoring case.
	///
	/// Unrecognized names fall back to [`SortType::Weight`].
	#[must_use]
	pub fn from_name(name: &str) -> Self {
		match name.to_ascii_lowercase().as_str() {
			"red" => Self::Red,
			"green" => Self::Green,
			"blue" => Self::Blue,
			_ => Self::Weight,
		}
	}

	/// The CIELAB point that clusters are ordered by their distance to, if any
	#[must_use]
	#[allow(clippy::lossy_float_literal)]
	pub fn focal_color(self) -> Option<Lab> {
		match self {
			Self::Weight => None,
			Self::Red => Some(Lab::new(53.23288178584245, 80.10930952982204, 67.22006831026425)),
			Self::Green => Some(Lab::new(87.73703347354422, -86.18463649762525, 83.18116474777854)),
			Self::Blue => Some(Lab::new(32.302586667249486, 79.19666178930935, -107.86368104495168)),
		}
	}
}

impl KmeansResult {
	/// Reorder the centroids and their counts in place.
	///
	/// This is a bubble sort that stops after the first pass without a swap,
	/// so clusters that compare equal keep their relative order.
	pub fn sort(&mut self, sort: SortType) {
		debug_assert_eq!(self.centroids.len(), self.counts.len());
		let focal = sort.focal_color();
		let len = self.centroids.len();

		for _ in 0..len {
			let mut swapped = false;

			for i in 0..len.saturating_sub(1) {
				let out_of_order = match focal {
					None => self.counts[i + 1] > self.counts[i],
					Some(focal) => {
						color::squared_distance(self.centroids[i + 1], focal)
							< color::squared_distance(self.centroids[i], focal)
					},
				};

				if out_of_order {
					self.centroids.swap(i, i + 1);
					self.counts.swap(i, i + 1);
					swapped = true;
				}
			}

			if !swapped {
				break;
			}
		}
	}
}
