//! A small, deterministic random number generator used to seed k-means

use rand::{Error, RngCore, SeedableRng};

/// A 32-bit xorshift generator
///
/// The whole state is a single `u32` which is updated on every draw,
/// so two generators created with the same seed produce the same sequence.
///
/// A seed of `0` is accepted, but it is degenerate: xorshift maps zero to zero,
/// so every draw from such a generator returns `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift32 {
	/// Current state, also the last returned value
	state: u32,
}

impl XorShift32 {
	/// Create a generator with the given seed
	#[must_use]
	pub const fn new(seed: u32) -> Self {
		Self { state: seed }
	}

	/// Draw a value in `min..max` as `min + (draw % (max - min))`
	///
	/// This is modulo biased whenever `max - min` does not evenly divide `2^32`.
	/// That is fine for picking starting centroids, but this should not be used as a uniform sampler.
	///
	/// `max` must be greater than `min`.
	pub fn gen_between(&mut self, min: u32, max: u32) -> u32 {
		debug_assert!(min < max, "empty range {min}..{max}");
		let value = min + self.next_u32() % (max - min);
		debug_assert!((min..max).contains(&value));
		value
	}
}

impl RngCore for XorShift32 {
	fn next_u32(&mut self) -> u32 {
		let mut x = self.state;
		x ^= x << 13;
		x ^= x >> 17;
		x ^= x << 5;
		self.state = x;
		x
	}

	fn next_u64(&mut self) -> u64 {
		let low = u64::from(self.next_u32());
		let high = u64::from(self.next_u32());
		(high << 32) | low
	}

	fn fill_bytes(&mut self, dest: &mut [u8]) {
		for chunk in dest.chunks_mut(4) {
			let bytes = self.next_u32().to_le_bytes();
			chunk.copy_from_slice(&bytes[..chunk.len()]);
		}
	}

	fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
		self.fill_bytes(dest);
		Ok(())
	}
}

impl SeedableRng for XorShift32 {
	type Seed = [u8; 4];

	fn from_seed(seed: Self::Seed) -> Self {
		Self::new(u32::from_le_bytes(seed))
	}
}
