use std::{any::Any, panic::{self, AssertUnwindSafe}, thread};

use log::{debug, warn};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{batch::Batch, error::Error};

/// A failed task of a batched operation. `batch` is None if the operation failed as a whole before any
/// tasks were dispatched (e.g. the output file couldn't be created)
#[derive(Debug)]
pub struct TaskFailure {
	pub batch: Option<Batch>,
	pub error: Error
}

impl TaskFailure {
	pub fn new(batch: Batch, error: Error) -> Self {
		TaskFailure { batch: Some(batch), error }
	}

	pub fn whole(error: impl Into<Error>) -> Self {
		TaskFailure { batch: None, error: error.into() }
	}
}

/// Half of the available hardware parallelism, and at least 1
pub fn default_thread_count() -> usize {
	thread::available_parallelism().map(|n| n.get() / 2).unwrap_or(1).max(1)
}

/// A fixed-size pool of worker threads that batched operations are dispatched onto.
///
/// Created once per benchmark run and passed by reference to every operation. After `shutdown` the pool
/// refuses further work with `Error::PoolShutDown`
pub struct WorkerPool {
	pool: Option<ThreadPool>,
	num_threads: usize
}

impl WorkerPool {
	/// Creates a pool sized to half the available hardware parallelism
	pub fn new() -> Result<Self, Error> {
		Self::with_threads(default_thread_count())
	}

	pub fn with_threads(num_threads: usize) -> Result<Self, Error> {
		let num_threads = num_threads.max(1);
		let pool = ThreadPoolBuilder::new()
			.num_threads(num_threads)
			.thread_name(|i| format!("writebench-worker-{}", i))
			.build()?;

		debug!("Started worker pool with {} threads", num_threads);

		Ok(WorkerPool {
			pool: Some(pool),
			num_threads
		})
	}

	pub fn num_threads(&self) -> usize {
		self.num_threads
	}

	pub fn is_shut_down(&self) -> bool {
		self.pool.is_none()
	}

	/// Releases the worker threads. Calling this more than once is a no-op
	pub fn shutdown(&mut self) {
		if self.pool.take().is_some() {
			debug!("Shut down worker pool");
		}
	}

	/// Runs `f` once for every task on the pool's threads, blocking until all of them have finished.
	///
	/// A task that returns an error or panics does not stop its siblings - Its failure is collected and returned,
	/// in batch order. The outer Err is reserved for the pool itself being unusable
	pub fn dispatch<T, F>(&self, tasks: Vec<(Batch, T)>, f: F) -> Result<Vec<TaskFailure>, Error>
	where
		T: Send,
		F: Fn(Batch, T) -> Result<(), Error> + Sync + Send
	{
		let pool = self.pool.as_ref().ok_or(Error::PoolShutDown)?;

		let failures: Vec<TaskFailure> = pool.install(|| {
			tasks.into_par_iter()
				.with_max_len(1)
				.filter_map(|(batch, task)| {
					let res = match panic::catch_unwind(AssertUnwindSafe(|| f(batch, task))) {
						Ok(res) => res,
						Err(payload) => Err(Error::TaskPanicked(panic_message(payload)))
					};

					res.err().map(|error| {
						warn!("Task for batch [{}, {}) failed: {}", batch.start, batch.end, error);
						TaskFailure::new(batch, error)
					})
				})
				.collect()
		});

		Ok(failures)
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		msg.to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
