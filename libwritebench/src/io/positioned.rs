use std::{os::unix::fs::FileExt, path::Path, time::Instant};

use log::debug;

use crate::{batch::{self, Batch}, error::Error, generate, pool::WorkerPool};

use super::{create_presized, WriteOutcome};

/// Writes the whole of `bytes` with a single positioned write at offset 0 into a pre-sized file
pub fn write_positioned(path: impl AsRef<Path>, bytes: &[u8]) -> WriteOutcome {
	let path = path.as_ref();
	let start = Instant::now();

	let res = create_presized(path, bytes.len()).and_then(|file| file.write_all_at(bytes, 0));

	debug!("Positioned write of {} bytes to \"{}\" took {:?}", bytes.len(), path.display(), start.elapsed());

	match res {
		Ok(()) => WriteOutcome::new(path, Vec::new()),
		Err(e) => WriteOutcome::failed(path, e)
	}
}

/// Writes `bytes` into a pre-sized file with one task per batch, each task writing `bytes[start..end]` at offset `start`.
/// All tasks share the one file handle - Positioned writes don't move a shared cursor.
///
/// Errors only if `batches` don't partition `bytes` or the pool has been shut down. I/O failures are reported in the outcome
pub fn write_positioned_parallel(pool: &WorkerPool, path: impl AsRef<Path>, bytes: &[u8], batches: &[Batch]) -> Result<WriteOutcome, Error> {
	let path = path.as_ref();
	batch::check_partition(batches, bytes.len())?;
	let start = Instant::now();

	let file = match create_presized(path, bytes.len()) {
		Ok(file) => file,
		Err(e) => return Ok(WriteOutcome::failed(path, e))
	};

	let tasks = batches.iter().map(|b| (*b, &bytes[b.range()])).collect();
	let failures = pool.dispatch(tasks, |batch, data| {
		file.write_all_at(data, batch.start as u64)?;
		Ok(())
	})?;

	debug!("Parallel positioned write of {} bytes in {} batches to \"{}\" took {:?}", bytes.len(), batches.len(), path.display(), start.elapsed());

	Ok(WriteOutcome::new(path, failures))
}

/// Each task generates the bytes of its batch (independent generator per batch, see `generate::generate_batch`) and writes them
/// at the batch's offset, so the full sequence is never held in memory at once
pub fn generate_and_write_positioned_parallel(pool: &WorkerPool, path: impl AsRef<Path>, batches: &[Batch], seed: u64) -> Result<WriteOutcome, Error> {
	let path = path.as_ref();
	let size = batches.last().map(|b| b.end).unwrap_or(0);
	batch::check_partition(batches, size)?;
	let start = Instant::now();

	let file = match create_presized(path, size) {
		Ok(file) => file,
		Err(e) => return Ok(WriteOutcome::failed(path, e))
	};

	let tasks = batches.iter().enumerate().map(|(i, b)| (*b, i)).collect();
	let failures = pool.dispatch(tasks, |batch, batch_idx| {
		let mut buf = vec![0; batch.len()];
		generate::generate_batch(seed, batch_idx, &mut buf);
		file.write_all_at(&buf, batch.start as u64)?;
		Ok(())
	})?;

	debug!("Parallel generate and positioned write of {} bytes in {} batches to \"{}\" took {:?}", size, batches.len(), path.display(), start.elapsed());

	Ok(WriteOutcome::new(path, failures))
}
