//! Provides the implementation for (naive) k-means

use crate::{
	bitmap::PixelBuffer,
	color::{self, Lab},
	random::XorShift32,
};
use std::collections::HashMap;

/// The minimum number of clusters
pub const MIN_CLUSTERS: u8 = 1;

/// The maximum number of clusters
pub const MAX_CLUSTERS: u8 = 64;

/// The number of observations each cluster has room for before its buffer first grows
const INITIAL_OBSERVATION_CAPACITY: usize = 512;

/// Clamp a requested number of clusters to `MIN_CLUSTERS..=MAX_CLUSTERS`
#[must_use]
pub fn clamp_cluster_count(cluster_count: i64) -> u8 {
	let clamped = cluster_count.clamp(i64::from(MIN_CLUSTERS), i64::from(MAX_CLUSTERS));
	// in 1..=64 after the clamp
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	{
		clamped as u8
	}
}

/// CIELAB colors for every pixel of an image in row-major order
#[derive(Debug, Clone)]
pub struct LabPixels {
	/// One color per pixel
	pub(crate) colors: Vec<Lab>,
	/// Width of the source image
	pub(crate) width: u32,
	/// Height of the source image
	pub(crate) height: u32,
}

impl LabPixels {
	/// Convert each pixel of `pixels` to CIELAB
	///
	/// # Panics
	/// Panics if the buffer has more than `u32::MAX` pixels
	#[must_use]
	pub fn from_pixels(pixels: &PixelBuffer) -> Self {
		assert!(u32::try_from(pixels.num_pixels()).is_ok(), "more than u32::MAX pixels");

		// Converting to CIELAB is expensive and images tend to repeat colors,
		// so each distinct sRGB color is only converted once.
		let mut memo: HashMap<u32, Lab> = HashMap::new();

		let colors = pixels
			.pixels()
			.map(|srgb| {
				let key = srgb.into_u32::<palette::rgb::channels::Rgba>();
				*memo.entry(key).or_insert_with(|| color::srgb_to_lab(srgb))
			})
			.collect();

		Self {
			colors,
			width: pixels.width(),
			height: pixels.height(),
		}
	}

	/// The CIELAB colors in row-major order
	#[must_use]
	pub fn colors(&self) -> &[Lab] {
		&self.colors
	}

	/// The color of the pixel at `(x, y)`
	fn at(&self, x: u32, y: u32) -> Lab {
		self.colors[y as usize * self.width as usize + x as usize]
	}

	/// The number of pixels
	#[must_use]
	pub fn num_pixels(&self) -> u32 {
		// checked in from_pixels
		#[allow(clippy::cast_possible_truncation)]
		{
			self.colors.len() as u32
		}
	}
}

/// A centroid and the observations assigned to it during the current pass
#[derive(Debug, Clone)]
struct Cluster {
	/// The centroid point
	centroid: Lab,
	/// Colors assigned to this cluster since the last recompute
	observations: Vec<Lab>,
}

impl Cluster {
	/// Create an empty cluster centered on `centroid`
	fn new(centroid: Lab) -> Self {
		Self {
			centroid,
			observations: Vec::with_capacity(INITIAL_OBSERVATION_CAPACITY),
		}
	}

	/// Move the centroid to the mean of its observations, then clear them.
	///
	/// A cluster with no observations is moved to `Lab(0, 0, 0)` and is not reseeded.
	fn recompute_centroid(&mut self) {
		self.centroid = if self.observations.is_empty() {
			Lab::new(0.0, 0.0, 0.0)
		} else {
			let (mut l, mut a, mut b) = (0.0, 0.0, 0.0);
			for color in &self.observations {
				l += f64::from(color.l);
				a += f64::from(color.a);
				b += f64::from(color.b);
			}

			// (usize as f64) is exact for any realistic number of pixels
			#[allow(clippy::cast_precision_loss)]
			let n = self.observations.len() as f64;

			// Sums may need greater precision, but the average can fall back down to a reduced precision
			#[allow(clippy::cast_possible_truncation)]
			Lab::new((l / n) as f32, (a / n) as f32, (b / n) as f32)
		};

		// keeps the allocated capacity for the next pass
		self.observations.clear();
	}
}

/// Result from running k-means
#[derive(Debug, Clone)]
pub struct KmeansResult {
	/// Final centroid colors, one per cluster, including empty clusters
	pub centroids: Vec<Lab>,
	/// Number of pixels assigned to each centroid in the last pass
	pub counts: Vec<u32>,
	/// Number of centroid recomputes
	pub iterations: u32,
	/// Whether the last pass left every assignment unchanged
	///
	/// This is only `false` if the maximum number of iterations was reached.
	pub converged: bool,
}

impl KmeansResult {
	/// The total number of pixels over all clusters
	#[must_use]
	pub fn total(&self) -> u64 {
		self.counts.iter().copied().map(u64::from).sum()
	}
}

/// Choose the starting centroids by picking random pixels.
///
/// Nothing stops two clusters from starting on the same pixel.
fn seed_clusters(lab: &LabPixels, k: u8, rng: &mut XorShift32) -> Vec<Cluster> {
	(0..k)
		.map(|_| {
			let x = rng.gen_between(0, lab.width);
			let y = rng.gen_between(0, lab.height);
			Cluster::new(lab.at(x, y))
		})
		.collect()
}

/// Find the index of the closest cluster, preferring the lowest index on ties
// clusters.len() <= MAX_CLUSTERS
#[allow(clippy::cast_possible_truncation)]
fn nearest_cluster(clusters: &[Cluster], color: Lab) -> u8 {
	let mut min_dist = f32::MAX;
	let mut min_cluster = 0;
	for (i, cluster) in clusters.iter().enumerate() {
		let dist = color::squared_distance(color, cluster.centroid);
		if dist < min_dist {
			min_dist = dist;
			min_cluster = i;
		}
	}
	min_cluster as u8
}

/// Assign each pixel to its closest cluster, returning whether any assignment changed.
///
/// On the first pass the previous assignments are meaningless and never count as a change.
fn update_assignments(lab: &LabPixels, clusters: &mut [Cluster], assignments: &mut [u8], first_pass: bool) -> bool {
	let mut changed = false;
	for (&color, assignment) in lab.colors.iter().zip(assignments) {
		let nearest = nearest_cluster(clusters, color);
		clusters[usize::from(nearest)].observations.push(color);

		if !first_pass && nearest != *assignment {
			changed = true;
		}

		*assignment = nearest;
	}
	changed
}

/// Recompute every centroid from the observations of the last pass
fn update_centroids(clusters: &mut [Cluster]) {
	for cluster in clusters {
		cluster.recompute_centroid();
	}
}

/// Run k-means until no assignment changes or `max_iter` centroid recomputes have been done
fn kmeans(lab: &LabPixels, k: u8, max_iter: u32, seed: u32) -> KmeansResult {
	let mut rng = XorShift32::new(seed);
	let mut clusters = seed_clusters(lab, k, &mut rng);
	let mut assignments = vec![0; lab.colors.len()];

	let mut iterations = 0;
	let mut first_pass = true;
	let converged = loop {
		let changed = update_assignments(lab, &mut clusters, &mut assignments, first_pass);
		if !(first_pass || changed) {
			break true;
		}

		if iterations >= max_iter {
			break false;
		}

		update_centroids(&mut clusters);
		iterations += 1;
		first_pass = false;
	};

	// each count is at most the number of pixels which fits in a u32
	#[allow(clippy::cast_possible_truncation)]
	let counts = clusters.iter().map(|cluster| cluster.observations.len() as u32).collect();
	let centroids = clusters.iter().map(|cluster| cluster.centroid).collect();

	KmeansResult { centroids, counts, iterations, converged }
}

/// Run k-means with `cluster_count` clusters, clamped to `MIN_CLUSTERS..=MAX_CLUSTERS`
///
/// `max_iter` bounds the number of centroid recomputes; use `u32::MAX` to run until convergence.
#[must_use]
pub fn run(lab: &LabPixels, cluster_count: u8, max_iter: u32, seed: u32) -> KmeansResult {
	let k = cluster_count.clamp(MIN_CLUSTERS, MAX_CLUSTERS);
	kmeans(lab, k, max_iter, seed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use image::{Rgba, RgbaImage};
	use palette::Srgb;

	fn image(width: u32, height: u32, pixels: &[[u8; 3]]) -> LabPixels {
		let image = RgbaImage::from_fn(width, height, |x, y| {
			let [r, g, b] = pixels[(y * width + x) as usize];
			Rgba([r, g, b, u8::MAX])
		});
		LabPixels::from_pixels(&PixelBuffer::from(image))
	}

	fn gradient() -> LabPixels {
		#[allow(clippy::cast_possible_truncation)]
		let image = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 128, u8::MAX]));
		LabPixels::from_pixels(&PixelBuffer::from(image))
	}

	fn four_colors() -> LabPixels {
		image(2, 2, &[[255, 0, 0], [0, 255, 0], [0, 0, 255], [0, 0, 0]])
	}

	#[test]
	fn cluster_count_is_clamped() {
		assert_eq!(clamp_cluster_count(0), 1);
		assert_eq!(clamp_cluster_count(-7), 1);
		assert_eq!(clamp_cluster_count(65), 64);
		assert_eq!(clamp_cluster_count(i64::MAX), 64);
		assert_eq!(clamp_cluster_count(12), 12);
	}

	#[test]
	fn run_clamps_cluster_count() {
		let data = gradient();
		assert_eq!(run(&data, 0, 8, 1).centroids.len(), 1);
		assert_eq!(run(&data, 65, 8, 1).centroids.len(), 64);
	}

	#[test]
	fn repeated_colors_share_a_conversion() {
		let data = image(3, 1, &[[10, 20, 30], [200, 100, 0], [10, 20, 30]]);
		assert_eq!(data.colors()[0], data.colors()[2]);
		assert_eq!(data.colors()[1], color::srgb_to_lab(Srgb::new(200, 100, 0)));
	}

	#[test]
	fn nearest_cluster_prefers_lowest_index() {
		let clusters = [
			Cluster::new(Lab::new(10.0, 0.0, 0.0)),
			Cluster::new(Lab::new(50.0, 0.0, 0.0)),
			Cluster::new(Lab::new(50.0, 0.0, 0.0)),
		];
		assert_eq!(nearest_cluster(&clusters, Lab::new(60.0, 0.0, 0.0)), 1);
		assert_eq!(nearest_cluster(&clusters, Lab::new(30.0, 0.0, 0.0)), 0);
	}

	#[test]
	fn empty_cluster_resets_to_zero() {
		let mut cluster = Cluster::new(Lab::new(40.0, 20.0, -20.0));
		cluster.recompute_centroid();
		assert_eq!(cluster.centroid, Lab::new(0.0, 0.0, 0.0));
	}

	#[test]
	fn recompute_clears_observations_but_keeps_capacity() {
		let mut cluster = Cluster::new(Lab::new(0.0, 0.0, 0.0));
		for i in 0..1000u16 {
			cluster.observations.push(Lab::new(f32::from(i % 3), 1.0, -1.0));
		}
		let capacity = cluster.observations.capacity();
		assert!(capacity >= 1000);

		cluster.recompute_centroid();

		assert!(cluster.observations.is_empty());
		assert_eq!(cluster.observations.capacity(), capacity);
		assert_relative_eq!(cluster.centroid, Lab::new(0.999, 1.0, -1.0), epsilon = 1e-5);
	}

	#[test]
	fn first_pass_never_reports_changes() {
		let data = four_colors();
		let mut clusters = vec![Cluster::new(Lab::new(0.0, 0.0, 0.0)); 2];
		let mut assignments = vec![1; 4];

		assert!(!update_assignments(&data, &mut clusters, &mut assignments, true));
		assert_eq!(assignments, vec![0; 4]);
		assert_eq!(clusters[0].observations.len(), 4);

		update_centroids(&mut clusters);
		assignments.fill(1);
		assert!(update_assignments(&data, &mut clusters, &mut assignments, false));
	}

	#[test]
	fn single_cluster_converges_to_mean() {
		let data = gradient();
		let result = run(&data, 1, u32::MAX, 7);

		let n = f64::from(data.num_pixels());
		let (mut l, mut a, mut b) = (0.0, 0.0, 0.0);
		for color in data.colors() {
			l += f64::from(color.l);
			a += f64::from(color.a);
			b += f64::from(color.b);
		}

		#[allow(clippy::cast_possible_truncation)]
		let mean = Lab::new((l / n) as f32, (a / n) as f32, (b / n) as f32);

		assert!(result.converged);
		assert_eq!(result.iterations, 1);
		assert_eq!(result.counts, vec![data.num_pixels()]);
		assert_relative_eq!(result.centroids[0], mean, epsilon = 1e-4);
	}

	#[test]
	fn distinct_pixels_get_their_own_clusters() {
		let data = four_colors();

		// seeds that start each cluster on a different pixel
		for seed in [10, 15, 16, 21] {
			let result = run(&data, 4, u32::MAX, seed);

			assert!(result.converged);
			assert_eq!(result.iterations, 1);
			assert_eq!(result.counts, vec![1; 4]);

			for pixel in data.colors() {
				assert!(result.centroids.contains(pixel), "seed {seed}: {pixel:?} is not a centroid");
			}
		}

		// seed 10 happens to pick the pixels in order
		assert_eq!(run(&data, 4, u32::MAX, 10).centroids, data.colors());
	}

	#[test]
	fn duplicate_seeds_leave_empty_clusters() {
		// seed 0 always draws 0, so every cluster starts on the red pixel
		let result = run(&four_colors(), 4, u32::MAX, 0);

		assert!(result.converged);
		assert_eq!(result.counts, vec![3, 1, 0, 0]);
		assert_eq!(result.centroids[2], Lab::new(0.0, 0.0, 0.0));
		assert_eq!(result.centroids[3], Lab::new(0.0, 0.0, 0.0));
	}

	#[test]
	fn uniform_image_fills_one_cluster() {
		let data = image(10, 10, &[[30, 144, 255]; 100]);
		let result = run(&data, 3, u32::MAX, 12345);

		assert!(result.converged);
		assert_eq!(result.iterations, 1);
		assert_eq!(result.counts, vec![100, 0, 0]);
		assert_eq!(result.centroids[0], color::srgb_to_lab(Srgb::new(30, 144, 255)));
		assert_eq!(result.centroids[1], Lab::new(0.0, 0.0, 0.0));
		assert_eq!(result.centroids[2], Lab::new(0.0, 0.0, 0.0));
		assert_eq!(color::lab_to_srgb(result.centroids[1]), Srgb::new(0, 0, 0));
	}

	#[test]
	fn single_pixel_with_many_clusters() {
		let data = image(1, 1, &[[90, 60, 30]]);
		let result = run(&data, MAX_CLUSTERS, u32::MAX, 99);

		assert!(result.converged);
		assert_eq!(result.centroids.len(), 64);
		assert_eq!(result.counts[0], 1);
		assert_eq!(result.total(), 1);
		assert_eq!(result.centroids[0], data.colors()[0]);
	}

	#[test]
	fn max_iter_reached() {
		let data = gradient();

		let capped = run(&data, 8, 0, 3);
		assert!(!capped.converged);
		assert_eq!(capped.iterations, 0);
		assert_eq!(capped.total(), u64::from(data.num_pixels()));

		let capped = run(&data, 8, 1, 3);
		assert_eq!(capped.iterations, 1);
		assert_eq!(capped.total(), u64::from(data.num_pixels()));
	}

	#[test]
	fn same_seed_same_result() {
		let data = gradient();
		let x = run(&data, 8, 256, 0xC0FFEE);
		let y = run(&data, 8, 256, 0xC0FFEE);

		assert_eq!(x.centroids, y.centroids);
		assert_eq!(x.counts, y.counts);
		assert_eq!(x.iterations, y.iterations);
	}
}
