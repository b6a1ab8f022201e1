pub mod stream;
pub mod positioned;
pub mod mmap;

use std::{fs::{File, OpenOptions}, io, os::unix::fs::FileExt, path::{Path, PathBuf}};
#[cfg(target_os = "linux")]
use std::os::fd::AsRawFd;

use log::{debug, warn};

use crate::{error::Error, pool::TaskFailure, utils::file_len};

/// The result of a write strategy. Writes are best-effort: the path is always reported, and any failures that
/// occurred along the way are listed. The contents of ranges whose tasks failed are undefined
#[derive(Debug)]
pub struct WriteOutcome {
	pub path: PathBuf,
	pub failures: Vec<TaskFailure>
}

impl WriteOutcome {
	pub fn new(path: impl Into<PathBuf>, failures: Vec<TaskFailure>) -> Self {
		WriteOutcome {
			path: path.into(),
			failures
		}
	}

	/// An outcome where the operation failed as a whole
	pub fn failed(path: impl Into<PathBuf>, error: impl Into<Error>) -> Self {
		let path = path.into();
		let failure = TaskFailure::whole(error);
		warn!("Writing \"{}\" failed: {}", path.display(), failure.error);

		WriteOutcome {
			path,
			failures: vec![ failure ]
		}
	}
}

/// Creates (or truncates) the file at `path` for reading and writing, and sets its length to `len` so that
/// writes at any offset within it never extend it
pub fn create_presized(path: &Path, len: usize) -> Result<File, io::Error> {
	let file = OpenOptions::new()
		.read(true)
		.write(true)
		.create(true)
		.truncate(true)
		.open(path)?;

	file.set_len(len as u64)?;

	Ok(file)
}

/// Reads the first `expected_size` bytes of the file at `path` with a positioned read. Errors if the file is shorter
pub fn read_all(path: impl AsRef<Path>, expected_size: usize) -> Result<Vec<u8>, Error> {
	let mut file = File::open(path.as_ref())?;

	#[cfg(target_os = "linux")]
	unsafe {
		libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL);
	}

	let actual_size = file_len(&mut file)?;
	if actual_size != expected_size as u64 {
		debug!("\"{}\" is {} bytes, expected {}", path.as_ref().display(), actual_size, expected_size);
	}

	let mut bytes = vec![0; expected_size];
	file.read_exact_at(&mut bytes, 0)?;

	Ok(bytes)
}

#[cfg(test)]
mod test {
	use std::{fs, io::ErrorKind};

	use crate::{batch::plan, error::Error, generate::{generate_parallel, generate_serial, SeedPolicy}, pool::WorkerPool, utils::init_test_logger};

	use super::{create_presized, mmap, positioned, read_all, stream};

	const SIZE: usize = 1_000_003;

	#[test]
	fn test_create_presized() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("presized.bin");
		fs::write(&path, vec![1u8; 4096]).unwrap();

		let file = create_presized(&path, 100).unwrap();

		assert_eq!(file.metadata().unwrap().len(), 100);
		assert_eq!(fs::read(&path).unwrap(), vec![0u8; 100]);
	}

	#[test]
	fn test_read_all_short_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("short.bin");
		fs::write(&path, [1, 2, 3]).unwrap();

		assert_eq!(read_all(&path, 2).unwrap(), vec![ 1, 2 ]);
		match read_all(&path, 4) {
			Err(Error::IoError(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
			res => panic!("Expected an UnexpectedEof error, got {:?}", res.map(|b| b.len()))
		}
	}

	#[test]
	fn test_cross_strategy_equivalence() {
		init_test_logger();

		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::with_threads(4).unwrap();
		let batches = plan(SIZE, pool.num_threads());
		let bytes = generate_serial(SIZE, 0);

		let outcomes = [
			stream::write_stream(dir.path().join("stream.txt"), &bytes),
			positioned::write_positioned(dir.path().join("positioned.txt"), &bytes),
			positioned::write_positioned_parallel(&pool, dir.path().join("positioned_parallel.txt"), &bytes, &batches).unwrap(),
			mmap::write_mapped(dir.path().join("mapped.txt"), &bytes),
			mmap::write_mapped_parallel(&pool, dir.path().join("mapped_parallel.txt"), &bytes, &batches).unwrap(),
			mmap::generate_and_write_mapped(dir.path().join("generate_mapped.txt"), SIZE, 0),
		];

		for outcome in &outcomes {
			assert!(outcome.failures.is_empty(), "{} failed: {:?}", outcome.path.display(), outcome.failures);
			assert_eq!(fs::metadata(&outcome.path).unwrap().len(), SIZE as u64);

			let read_back = read_all(&outcome.path, SIZE).unwrap();
			assert!(read_back == bytes, "{} differs from the source buffer", outcome.path.display());
		}
	}

	#[test]
	fn test_generate_and_write_matches_independent_generation() {
		init_test_logger();

		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::with_threads(3).unwrap();
		let batches = plan(SIZE, pool.num_threads());
		let expected = generate_parallel(&pool, &batches, 5, SeedPolicy::IndependentPerBatch).unwrap().bytes;

		let positioned = positioned::generate_and_write_positioned_parallel(&pool, dir.path().join("positioned.txt"), &batches, 5).unwrap();
		let mapped = mmap::generate_and_write_mapped_parallel(&pool, dir.path().join("mapped.txt"), &batches, 5).unwrap();

		for outcome in [ positioned, mapped ] {
			assert!(outcome.failures.is_empty());
			assert!(read_all(&outcome.path, SIZE).unwrap() == expected, "{} differs from the per-batch generation", outcome.path.display());
		}
	}

	#[test]
	fn test_zero_size() {
		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::with_threads(2).unwrap();
		let batches = plan(0, pool.num_threads());
		let bytes = Vec::new();

		assert_eq!(batches.len(), 1);
		assert!(batches[0].is_empty());

		let outcomes = [
			stream::write_stream(dir.path().join("stream.txt"), &bytes),
			positioned::write_positioned(dir.path().join("positioned.txt"), &bytes),
			positioned::write_positioned_parallel(&pool, dir.path().join("positioned_parallel.txt"), &bytes, &batches).unwrap(),
			positioned::generate_and_write_positioned_parallel(&pool, dir.path().join("generate_positioned_parallel.txt"), &batches, 0).unwrap(),
			mmap::write_mapped(dir.path().join("mapped.txt"), &bytes),
			mmap::write_mapped_parallel(&pool, dir.path().join("mapped_parallel.txt"), &bytes, &batches).unwrap(),
			mmap::generate_and_write_mapped(dir.path().join("generate_mapped.txt"), 0, 0),
			mmap::generate_and_write_mapped_parallel(&pool, dir.path().join("generate_mapped_parallel.txt"), &batches, 0).unwrap(),
		];

		for outcome in &outcomes {
			assert!(outcome.failures.is_empty(), "{} failed: {:?}", outcome.path.display(), outcome.failures);
			assert_eq!(fs::metadata(&outcome.path).unwrap().len(), 0);
			assert!(read_all(&outcome.path, 0).unwrap().is_empty());
		}
	}

	#[test]
	fn test_unwritable_path_reports_failure() {
		init_test_logger();

		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::with_threads(2).unwrap();
		let batches = plan(64, pool.num_threads());
		let bytes = generate_serial(64, 0);
		let path = dir.path().join("missing_dir").join("out.txt");

		let outcomes = [
			stream::write_stream(&path, &bytes),
			positioned::write_positioned(&path, &bytes),
			positioned::write_positioned_parallel(&pool, &path, &bytes, &batches).unwrap(),
			mmap::write_mapped(&path, &bytes),
			mmap::write_mapped_parallel(&pool, &path, &bytes, &batches).unwrap(),
			mmap::generate_and_write_mapped(&path, 64, 0),
			mmap::generate_and_write_mapped_parallel(&pool, &path, &batches, 0).unwrap(),
			positioned::generate_and_write_positioned_parallel(&pool, &path, &batches, 0).unwrap(),
		];

		for outcome in &outcomes {
			assert_eq!(outcome.path, path);
			assert_eq!(outcome.failures.len(), 1);
			assert!(outcome.failures[0].batch.is_none());
			assert!(matches!(outcome.failures[0].error, Error::IoError(_)));
		}
	}

	#[test]
	fn test_mismatched_batches_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::with_threads(2).unwrap();
		let bytes = vec![0u8; 100];

		let res = positioned::write_positioned_parallel(&pool, dir.path().join("out.txt"), &bytes, &plan(99, 2));
		assert!(matches!(res, Err(Error::BatchLayout(_))));

		let res = mmap::write_mapped_parallel(&pool, dir.path().join("out.txt"), &bytes, &plan(101, 2));
		assert!(matches!(res, Err(Error::BatchLayout(_))));
	}

	#[test]
	fn test_parallel_write_after_shutdown() {
		let dir = tempfile::tempdir().unwrap();
		let mut pool = WorkerPool::with_threads(2).unwrap();
		let bytes = vec![0u8; 100];
		let batches = plan(100, 2);
		pool.shutdown();

		assert!(matches!(positioned::write_positioned_parallel(&pool, dir.path().join("a.txt"), &bytes, &batches), Err(Error::PoolShutDown)));
		assert!(matches!(mmap::write_mapped_parallel(&pool, dir.path().join("b.txt"), &bytes, &batches), Err(Error::PoolShutDown)));
	}

	#[cfg(feature = "big_tests")]
	#[test]
	fn test_round_trip_100m() {
		init_test_logger();

		const BIG: usize = 100_000_000;

		let dir = tempfile::tempdir().unwrap();
		let pool = WorkerPool::new().unwrap();
		let batches = plan(BIG, pool.num_threads());
		let bytes = generate_serial(BIG, 0);

		let outcomes = [
			stream::write_stream(dir.path().join("stream.txt"), &bytes),
			positioned::write_positioned_parallel(&pool, dir.path().join("positioned_parallel.txt"), &bytes, &batches).unwrap(),
			mmap::write_mapped_parallel(&pool, dir.path().join("mapped_parallel.txt"), &bytes, &batches).unwrap(),
		];

		for outcome in &outcomes {
			assert!(outcome.failures.is_empty());
			assert!(read_all(&outcome.path, BIG).unwrap() == bytes);
		}
	}
}
