pub mod config;

use std::{fs, hint::black_box, ops::Range, path::{Path, PathBuf}, time::{Duration, Instant, SystemTime}};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{batch, error::Error, generate::{self, SeedPolicy}, io::{self, mmap, positioned, stream}, pool::{TaskFailure, WorkerPool}};

/// A named way of generating (and possibly writing) the byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	GenerateSerial,
	GenerateSerialPerByte,
	GenerateParallelIndependent,
	/// Parallel generation from one unsynchronised generator. Never part of the defaults - Its output is
	/// non-deterministic
	GenerateParallelUnsafeShared,
	WriteStream,
	WritePositioned,
	WritePositionedParallel,
	WriteMapped,
	WriteMappedParallel,
	GenerateAndWriteMapped,
	GenerateAndWritePositionedParallel,
	GenerateAndWriteMappedParallel,
}

/// What a strategy's output file should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedContent {
	/// `generate::generate_serial`
	Serial,
	/// `generate::generate_parallel` with `SeedPolicy::IndependentPerBatch`, over the same batches
	IndependentPerBatch,
}

impl Strategy {
	pub fn all() -> Vec<Strategy> {
		Strategy::iter().collect()
	}

	/// Every strategy except the unsafe shared generator baseline
	pub fn defaults() -> Vec<Strategy> {
		Strategy::iter().filter(|s| *s != Strategy::GenerateParallelUnsafeShared).collect()
	}

	/// The content of the file this strategy writes, or None if it only generates
	pub fn expected_content(&self) -> Option<ExpectedContent> {
		match self {
			Strategy::GenerateSerial
			| Strategy::GenerateSerialPerByte
			| Strategy::GenerateParallelIndependent
			| Strategy::GenerateParallelUnsafeShared => None,
			Strategy::WriteStream
			| Strategy::WritePositioned
			| Strategy::WritePositionedParallel
			| Strategy::WriteMapped
			| Strategy::WriteMappedParallel
			| Strategy::GenerateAndWriteMapped => Some(ExpectedContent::Serial),
			Strategy::GenerateAndWritePositionedParallel
			| Strategy::GenerateAndWriteMappedParallel => Some(ExpectedContent::IndependentPerBatch),
		}
	}

	pub fn writes_file(&self) -> bool {
		self.expected_content().is_some()
	}
}

/// One timed run of a strategy
#[derive(Debug)]
pub struct Execution {
	pub strategy: Strategy,
	/// The file written, if the strategy writes one
	pub path: Option<PathBuf>,
	pub elapsed: Duration,
	pub failures: Vec<TaskFailure>
}

/// Everything a strategy needs to run: the seed and size of the sequence, where to write it, and the pool to run batches on
pub struct Workbench<'p> {
	pool: &'p WorkerPool,
	seed: u64,
	file_size: usize,
	catalog: PathBuf,
}

impl<'p> Workbench<'p> {
	/// Creates the catalog directory if it doesn't exist yet
	pub fn new(pool: &'p WorkerPool, seed: u64, file_size: usize, catalog: impl AsRef<Path>) -> Result<Self, Error> {
		let catalog = catalog.as_ref().to_path_buf();
		fs::create_dir_all(&catalog)?;

		Ok(Workbench {
			pool,
			seed,
			file_size,
			catalog
		})
	}

	/// `<catalog>/<operation>-<HH-mm-ss>.txt`. Two calls within the same second give the same path
	pub fn output_path(&self, operation: &str) -> PathBuf {
		self.catalog.join(format!("{}-{}.txt", operation, time_suffix(SystemTime::now())))
	}

	/// Runs `strategy` once, timing all of its generation and writing.
	///
	/// Errors only on misuse (e.g. a shut down pool). Failures of individual tasks are collected into the execution
	pub fn execute(&self, strategy: Strategy) -> Result<Execution, Error> {
		let batches = batch::plan(self.file_size, self.pool.num_threads());
		let path = self.output_path(&strategy.to_string());

		let start = Instant::now();
		let failures = match strategy {
			Strategy::GenerateSerial => {
				black_box(generate::generate_serial(self.file_size, self.seed));
				Vec::new()
			}
			Strategy::GenerateSerialPerByte => {
				black_box(generate::generate_serial_per_byte(self.file_size, self.seed));
				Vec::new()
			}
			Strategy::GenerateParallelIndependent => {
				let generated = generate::generate_parallel(self.pool, &batches, self.seed, SeedPolicy::IndependentPerBatch)?;
				black_box(generated.bytes);
				generated.failures
			}
			Strategy::GenerateParallelUnsafeShared => {
				let generated = generate::generate_parallel(self.pool, &batches, self.seed, SeedPolicy::UnsafeShared)?;
				black_box(generated.bytes);
				generated.failures
			}
			Strategy::WriteStream => {
				let bytes = generate::generate_serial(self.file_size, self.seed);
				stream::write_stream(&path, &bytes).failures
			}
			Strategy::WritePositioned => {
				let bytes = generate::generate_serial(self.file_size, self.seed);
				positioned::write_positioned(&path, &bytes).failures
			}
			Strategy::WritePositionedParallel => {
				let bytes = generate::generate_serial(self.file_size, self.seed);
				positioned::write_positioned_parallel(self.pool, &path, &bytes, &batches)?.failures
			}
			Strategy::WriteMapped => {
				let bytes = generate::generate_serial(self.file_size, self.seed);
				mmap::write_mapped(&path, &bytes).failures
			}
			Strategy::WriteMappedParallel => {
				let bytes = generate::generate_serial(self.file_size, self.seed);
				mmap::write_mapped_parallel(self.pool, &path, &bytes, &batches)?.failures
			}
			Strategy::GenerateAndWriteMapped => {
				mmap::generate_and_write_mapped(&path, self.file_size, self.seed).failures
			}
			Strategy::GenerateAndWritePositionedParallel => {
				positioned::generate_and_write_positioned_parallel(self.pool, &path, &batches, self.seed)?.failures
			}
			Strategy::GenerateAndWriteMappedParallel => {
				mmap::generate_and_write_mapped_parallel(self.pool, &path, &batches, self.seed)?.failures
			}
		};
		let elapsed = start.elapsed();

		debug!("Operation: {} - execution time = {} ms", strategy, elapsed.as_millis());

		Ok(Execution {
			strategy,
			path: strategy.writes_file().then_some(path),
			elapsed,
			failures
		})
	}

	/// The bytes that the file written by `strategy` should contain, or None if it doesn't write one
	pub fn expected_content(&self, strategy: Strategy) -> Result<Option<Vec<u8>>, Error> {
		Ok(match strategy.expected_content() {
			None => None,
			Some(ExpectedContent::Serial) => Some(generate::generate_serial(self.file_size, self.seed)),
			Some(ExpectedContent::IndependentPerBatch) => {
				let batches = batch::plan(self.file_size, self.pool.num_threads());
				Some(generate::generate_parallel(self.pool, &batches, self.seed, SeedPolicy::IndependentPerBatch)?.bytes)
			}
		})
	}

	/// Reads the file written by `execution` back and compares it with what it should contain. Returns None if the
	/// execution didn't write a file, otherwise whether the contents matched. A file that can't be read doesn't match
	pub fn verify(&self, execution: &Execution) -> Result<Option<bool>, Error> {
		let (Some(path), Some(expected)) = (&execution.path, self.expected_content(execution.strategy)?) else {
			return Ok(None);
		};

		match io::read_all(path, self.file_size) {
			Ok(actual) if actual == expected => Ok(Some(true)),
			Ok(_) => {
				warn!("Contents of \"{}\" written by {} do not match the expected bytes", path.display(), execution.strategy);
				Ok(Some(false))
			}
			Err(e) => {
				warn!("Could not read back \"{}\" written by {}: {}", path.display(), execution.strategy, e);
				Ok(Some(false))
			}
		}
	}
}

/// `HH:MM:SS` within `YYYY-MM-DDTHH:MM:SSZ`, the fixed-width form `format_rfc3339_seconds` produces
const RFC3339_TIME_OF_DAY: Range<usize> = 11..19;

/// `HH-mm-ss` of `time`, in UTC
fn time_suffix(time: SystemTime) -> String {
	let rfc3339 = humantime::format_rfc3339_seconds(time).to_string();
	rfc3339[RFC3339_TIME_OF_DAY].replace(':', "-")
}
