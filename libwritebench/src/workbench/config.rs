use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::Strategy;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
	/// Seed of the generated sequence
	pub seed: u64,
	/// Number of bytes generated and written by each strategy
	pub file_size: usize,
	/// Directory the output files (and the report) are written to
	pub catalog: String,
	pub repetitions: usize,
	/// Number of leading repetitions whose samples are discarded
	pub warmup: usize,
	/// Worker pool size. Defaults to half the available parallelism
	pub threads: Option<usize>,
	#[serde(rename = "strategy")]
	pub strategies: Vec<Strategy>,
	/// Keep every output file instead of removing it once it has been timed (and verified)
	pub keep_files: bool,
	/// Read every output file back and compare it with the expected contents, outside of the timed region
	pub verify: bool,
	pub write_report: bool,
}

impl BenchConfig {
	pub fn validate(&self) -> Result<(), Error> {
		if self.repetitions == 0 {
			return Err(Error::ConfigValidationError("repetitions must be at least 1".to_string()));
		}
		if self.warmup >= self.repetitions {
			return Err(Error::ConfigValidationError(format!(
				"warmup ({}) must be less than repetitions ({}) - Otherwise no samples are kept",
				self.warmup,
				self.repetitions
			)));
		}
		if self.threads == Some(0) {
			return Err(Error::ConfigValidationError("threads must be at least 1".to_string()));
		}
		if self.strategies.is_empty() {
			return Err(Error::ConfigValidationError("No strategies configured".to_string()));
		}

		Ok(())
	}
}

impl Default for BenchConfig {
	fn default() -> Self {
		Self {
			seed: 0,
			file_size: 100_000_000,
			catalog: "results".to_string(),
			repetitions: 20,
			warmup: 4,
			threads: None,
			strategies: Strategy::defaults(),
			keep_files: false,
			verify: false,
			write_report: true,
		}
	}
}
