use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use tinyrand::{Rand, Seeded, StdRand};

use crate::{batch::{self, Batch}, error::Error, pool::{TaskFailure, WorkerPool}};

/// How the generator(s) used for parallel generation are seeded and shared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
	/// Every batch gets its own generator, seeded from the base seed and the batch index. Reproducible,
	/// but only equal to the serial output when there is a single batch
	IndependentPerBatch,
	/// UNSAFE BASELINE: every batch draws from one generator with no synchronisation around its state.
	/// Output is non-deterministic and never matches the serial output
	UnsafeShared,
}

/// Result of a parallel generation. Batches whose tasks failed are left zeroed
pub struct Generated {
	pub bytes: Vec<u8>,
	pub failures: Vec<TaskFailure>
}

/// Fills `buf` from `rng`, 8 bytes per draw
pub fn fill_bytes(rng: &mut impl Rand, buf: &mut [u8]) {
	let mut chunks = buf.chunks_exact_mut(8);
	for chunk in &mut chunks {
		chunk.copy_from_slice(&rng.next_u64().to_le_bytes());
	}
	let rem = chunks.into_remainder();
	if !rem.is_empty() {
		let last = rng.next_u64().to_le_bytes();
		rem.copy_from_slice(&last[..rem.len()]);
	}
}

/// The canonical output for `seed`: `size` bytes from one generator
pub fn generate_serial(size: usize, seed: u64) -> Vec<u8> {
	let mut bytes = vec![0; size];
	fill_bytes(&mut StdRand::seed(seed), &mut bytes);
	bytes
}

/// Like `generate_serial` but draws one bounded value per byte. Slower, and produces a different sequence
pub fn generate_serial_per_byte(size: usize, seed: u64) -> Vec<u8> {
	let mut rng = StdRand::seed(seed);
	(0..size).map(|_| rng.next_lim_u32(256) as u8).collect()
}

/// Seed of the generator owned by the batch at `batch_idx` under `SeedPolicy::IndependentPerBatch`
pub fn batch_seed(seed: u64, batch_idx: usize) -> u64 {
	seed.wrapping_add(batch_idx as u64)
}

/// Fills `buf` with the bytes of the batch at `batch_idx` under `SeedPolicy::IndependentPerBatch`
pub fn generate_batch(seed: u64, batch_idx: usize, buf: &mut [u8]) {
	fill_bytes(&mut StdRand::seed(batch_seed(seed, batch_idx)), buf);
}

/// Generates `size` bytes (the end of the last batch) on the pool, one task per batch
pub fn generate_parallel(pool: &WorkerPool, batches: &[Batch], seed: u64, policy: SeedPolicy) -> Result<Generated, Error> {
	match policy {
		SeedPolicy::IndependentPerBatch => fill_parallel(pool, batches, |batch_idx, part| {
			generate_batch(seed, batch_idx, part);
			Ok(())
		}),
		SeedPolicy::UnsafeShared => {
			let shared = SharedRand::new(seed);
			fill_parallel(pool, batches, |_, part| {
				for b in part.iter_mut() {
					*b = shared.next_u64() as u8;
				}
				Ok(())
			})
		}
	}
}

/// Runs `fill(batch_idx, part)` for every batch over a zeroed buffer. Batches whose task fails are zeroed again,
/// whatever the task wrote before failing
fn fill_parallel<F>(pool: &WorkerPool, batches: &[Batch], fill: F) -> Result<Generated, Error>
where
	F: Fn(usize, &mut [u8]) -> Result<(), Error> + Sync + Send
{
	let size = batches.last().map(|b| b.end).unwrap_or(0);
	let mut bytes = vec![0; size];

	let failures = {
		let tasks = batch::split_mut(&mut bytes, batches)?
			.into_iter()
			.enumerate()
			.map(|(i, (batch, part))| (batch, (i, part)))
			.collect();

		pool.dispatch(tasks, |_, (batch_idx, part)| fill(batch_idx, part))?
	};

	for failure in &failures {
		if let Some(batch) = failure.batch {
			warn!("Generation failed for batch [{}, {}), leaving it zeroed", batch.start, batch.end);
			bytes[batch.range()].fill(0);
		}
	}

	Ok(Generated { bytes, failures })
}

/// A Wyrand generator whose state is read and written by any number of threads with no coordination.
///
/// Each draw loads the state, derives the next value and stores it back as separate steps, so concurrent
/// callers race: draws get lost or repeated depending on scheduling. The state lives in an atomic so that
/// the race is on values only, not a data race
pub struct SharedRand {
	state: AtomicU64
}

impl SharedRand {
	pub fn new(seed: u64) -> Self {
		SharedRand { state: AtomicU64::new(seed) }
	}

	pub fn next_u64(&self) -> u64 {
		let state = self.state.load(Ordering::Relaxed);
		let next = StdRand::seed(state).next_u64();
		self.state.store(next, Ordering::Relaxed);
		next
	}
}
