use std::{fmt::Display, io};

use rayon::ThreadPoolBuildError;

macro_rules! impl_from_for_variant {
	($variant: path, $contained_type: ty) => {
		impl From<$contained_type> for Error {
			fn from(value: $contained_type) -> Self {
				$variant(value)
			}
		}
	};
}

#[derive(Debug)]
pub enum Error {
	IoError(io::Error),
	PoolBuildError(ThreadPoolBuildError),
	/// The worker pool was used after `WorkerPool::shutdown`
	PoolShutDown,
	/// A set of batches does not partition the buffer it was applied to
	BatchLayout(String),
	/// A task panicked - Carries the panic message if it was a string
	TaskPanicked(String),
	/// A strategy ended up with no samples to aggregate (e.g. every repetition was a warmup)
	NoSamples(String),
	ConfigValidationError(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", match self {
			Error::IoError(e) => e.to_string(),
			Error::PoolBuildError(e) => format!("Failed to build worker pool: {}", e),
			Error::PoolShutDown => "Worker pool has already been shut down".to_string(),
			Error::BatchLayout(msg) => format!("Invalid batch layout: {}", msg),
			Error::TaskPanicked(msg) => format!("Task panicked: {}", msg),
			Error::NoSamples(strategy) => format!("No timing samples were kept for strategy {} - Cannot aggregate", strategy),
			Error::ConfigValidationError(msg) => format!("Config validation error: {}", msg),
		})
	}
}

impl std::error::Error for Error {}

impl_from_for_variant!(Error::IoError, io::Error);
impl_from_for_variant!(Error::PoolBuildError, ThreadPoolBuildError);
