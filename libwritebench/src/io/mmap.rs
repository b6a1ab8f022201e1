use std::{fs::File, io, path::Path, time::Instant};

use log::debug;
use memmap::{MmapMut, MmapOptions};

use crate::{batch::{self, Batch}, error::Error, generate, pool::WorkerPool};

use super::{create_presized, WriteOutcome};

/// Maps `[0, len)` of `file` for writing. Returns None for `len == 0`, which cannot be mapped
fn map_region(file: &File, len: usize) -> Result<Option<MmapMut>, io::Error> {
	if len == 0 {
		return Ok(None);
	}

	let mut mmap = unsafe { MmapOptions::new().len(len).map_mut(file)? };

	#[cfg(target_os = "linux")]
	unsafe {
		libc::madvise(mmap.as_mut_ptr() as *mut libc::c_void, mmap.len(), libc::MADV_SEQUENTIAL);
	}

	Ok(Some(mmap))
}

/// Creates a file pre-sized to `len` and maps the whole of it
fn create_mapped(path: &Path, len: usize) -> Result<Option<MmapMut>, io::Error> {
	let file = create_presized(path, len)?;
	map_region(&file, len)
}

/// Copies the whole of `bytes` into a mapping of a pre-sized file
pub fn write_mapped(path: impl AsRef<Path>, bytes: &[u8]) -> WriteOutcome {
	let path = path.as_ref();
	let start = Instant::now();

	let res = create_mapped(path, bytes.len()).map(|mmap| {
		if let Some(mut mmap) = mmap {
			mmap.copy_from_slice(bytes);
		}
	});

	debug!("Mapped write of {} bytes to \"{}\" took {:?}", bytes.len(), path.display(), start.elapsed());

	match res {
		Ok(()) => WriteOutcome::new(path, Vec::new()),
		Err(e) => WriteOutcome::failed(path, e)
	}
}

/// Generates the canonical sequence for `seed` serially and copies it into a mapping of a pre-sized file
pub fn generate_and_write_mapped(path: impl AsRef<Path>, size: usize, seed: u64) -> WriteOutcome {
	let path = path.as_ref();

	match create_mapped(path, size) {
		Ok(Some(mut mmap)) => {
			let bytes = generate::generate_serial(size, seed);
			mmap.copy_from_slice(&bytes);
			WriteOutcome::new(path, Vec::new())
		}
		Ok(None) => WriteOutcome::new(path, Vec::new()),
		Err(e) => WriteOutcome::failed(path, e)
	}
}

/// Maps the whole pre-sized file once and hands each task the disjoint sub-slice of the mapping for its batch, into which
/// it copies `bytes[start..end]`. The mapping outlives every task, as the dispatch blocks until all are done.
///
/// Errors only if `batches` don't partition `bytes` or the pool has been shut down. I/O failures are reported in the outcome
pub fn write_mapped_parallel(pool: &WorkerPool, path: impl AsRef<Path>, bytes: &[u8], batches: &[Batch]) -> Result<WriteOutcome, Error> {
	let path = path.as_ref();
	batch::check_partition(batches, bytes.len())?;
	let start = Instant::now();

	let mut mmap = match create_mapped(path, bytes.len()) {
		Ok(Some(mmap)) => mmap,
		Ok(None) => return Ok(WriteOutcome::new(path, Vec::new())),
		Err(e) => return Ok(WriteOutcome::failed(path, e))
	};

	let regions = batch::split_mut(&mut mmap[..], batches)?;
	let failures = pool.dispatch(regions, |batch, region| {
		region.copy_from_slice(&bytes[batch.range()]);
		Ok(())
	})?;

	debug!("Parallel mapped write of {} bytes in {} batches to \"{}\" took {:?}", bytes.len(), batches.len(), path.display(), start.elapsed());

	Ok(WriteOutcome::new(path, failures))
}

/// Each task generates the bytes of its batch (independent generator per batch) directly into its sub-slice of a shared mapping
pub fn generate_and_write_mapped_parallel(pool: &WorkerPool, path: impl AsRef<Path>, batches: &[Batch], seed: u64) -> Result<WriteOutcome, Error> {
	let path = path.as_ref();
	let size = batches.last().map(|b| b.end).unwrap_or(0);
	batch::check_partition(batches, size)?;
	let start = Instant::now();

	let mut mmap = match create_mapped(path, size) {
		Ok(Some(mmap)) => mmap,
		Ok(None) => return Ok(WriteOutcome::new(path, Vec::new())),
		Err(e) => return Ok(WriteOutcome::failed(path, e))
	};

	let tasks = batch::split_mut(&mut mmap[..], batches)?
		.into_iter()
		.enumerate()
		.map(|(i, (batch, region))| (batch, (i, region)))
		.collect();
	let failures = pool.dispatch(tasks, |_, (batch_idx, region)| {
		generate::generate_batch(seed, batch_idx, region);
		Ok(())
	})?;

	debug!("Parallel generate and mapped write of {} bytes in {} batches to \"{}\" took {:?}", size, batches.len(), path.display(), start.elapsed());

	Ok(WriteOutcome::new(path, failures))
}
