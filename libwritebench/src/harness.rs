use std::{fs, io, path::{Path, PathBuf}};

use log::{info, warn};
use serde::Serialize;

use crate::{error::Error, pool::{self, WorkerPool}, workbench::{config::BenchConfig, Strategy, Workbench}};

/// How long one repetition of one strategy took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingSample {
	pub strategy: Strategy,
	pub millis: u64
}

/// Aggregated timings of one strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategySummary {
	pub strategy: Strategy,
	/// Mean of the kept samples, truncated
	pub average_millis: u64,
	pub min_millis: u64,
	/// Kept samples in repetition order
	pub samples: Vec<u64>,
	/// Failed tasks over every repetition, warmups included
	pub task_failures: usize,
	/// Read-backs that didn't match, over every repetition, warmups included
	pub verification_failures: usize,
}

struct StrategyRecord {
	strategy: Strategy,
	samples: Vec<u64>,
	task_failures: usize,
	verification_failures: usize
}

/// Collects timing samples and failure counts per strategy, remembering the order strategies were registered in
pub struct Timings {
	records: Vec<StrategyRecord>
}

impl Timings {
	/// Registers `strategies` up front, so that a strategy that ends up with no samples is an error when summarising
	/// rather than silently missing. Duplicates are registered once
	pub fn new(strategies: &[Strategy]) -> Self {
		let mut timings = Timings { records: Vec::new() };
		for &strategy in strategies {
			timings.record_mut(strategy);
		}
		timings
	}

	fn record_mut(&mut self, strategy: Strategy) -> &mut StrategyRecord {
		let idx = match self.records.iter().position(|r| r.strategy == strategy) {
			Some(idx) => idx,
			None => {
				self.records.push(StrategyRecord {
					strategy,
					samples: Vec::new(),
					task_failures: 0,
					verification_failures: 0
				});
				self.records.len() - 1
			}
		};

		&mut self.records[idx]
	}

	pub fn record(&mut self, sample: TimingSample) {
		self.record_mut(sample.strategy).samples.push(sample.millis);
	}

	pub fn record_task_failures(&mut self, strategy: Strategy, count: usize) {
		self.record_mut(strategy).task_failures += count;
	}

	pub fn record_verification_failure(&mut self, strategy: Strategy) {
		self.record_mut(strategy).verification_failures += 1;
	}

	/// Aggregates every strategy and ranks them by ascending average. Strategies with equal averages keep their registration order.
	///
	/// Errors if any registered strategy has no samples
	pub fn summarise(&self) -> Result<Vec<StrategySummary>, Error> {
		let mut summaries = self.records.iter()
			.map(|record| {
				let (average_millis, min_millis) = aggregate(&record.samples)
					.ok_or_else(|| Error::NoSamples(record.strategy.to_string()))?;

				Ok(StrategySummary {
					strategy: record.strategy,
					average_millis,
					min_millis,
					samples: record.samples.clone(),
					task_failures: record.task_failures,
					verification_failures: record.verification_failures
				})
			})
			.collect::<Result<Vec<_>, Error>>()?;

		summaries.sort_by_key(|s| s.average_millis);

		Ok(summaries)
	}
}

/// `(floor(sum / count), min)` of `samples`, or None if there are none
pub fn aggregate(samples: &[u64]) -> Option<(u64, u64)> {
	let min = *samples.iter().min()?;
	let sum: u64 = samples.iter().sum();
	Some((sum / samples.len() as u64, min))
}

/// Runs the benchmark described by `config` on a pool of its own, which is shut down before returning (successfully or not).
///
/// See `run_with_pool`
pub fn run(config: &BenchConfig) -> Result<Vec<StrategySummary>, Error> {
	let mut pool = WorkerPool::with_threads(config.threads.unwrap_or_else(pool::default_thread_count))?;
	let res = run_with_pool(&pool, config);
	pool.shutdown();
	res
}

/// Runs every configured strategy once per repetition, in configured order, and returns them ranked by average time.
/// Samples from the first `config.warmup` repetitions are discarded.
///
/// Failed tasks, failed verifications and files that can't be removed are logged and counted but don't stop the run.
/// Errors if the pool is unusable, the catalog can't be created, or a strategy ends up with no samples
pub fn run_with_pool(pool: &WorkerPool, config: &BenchConfig) -> Result<Vec<StrategySummary>, Error> {
	let bench = Workbench::new(pool, config.seed, config.file_size, &config.catalog)?;

	let mut strategies = config.strategies.clone();
	dedup_in_order(&mut strategies);

	info!(
		"Running {} strategies over {} bytes (seed {}), {} repetitions ({} warmup) on {} threads",
		strategies.len(),
		config.file_size,
		config.seed,
		config.repetitions,
		config.warmup,
		pool.num_threads()
	);

	run_on(&bench, config, &strategies)
}

fn run_on(bench: &Workbench, config: &BenchConfig, strategies: &[Strategy]) -> Result<Vec<StrategySummary>, Error> {
	let mut timings = Timings::new(strategies);

	for repetition in 0..config.repetitions {
		let warmup = repetition < config.warmup;
		info!("Repetition {}/{}{}", repetition + 1, config.repetitions, if warmup { " (warmup)" } else { "" });

		for &strategy in strategies {
			let execution = bench.execute(strategy)?;

			if !execution.failures.is_empty() {
				warn!("{} had {} failed task(s) in repetition {}", strategy, execution.failures.len(), repetition + 1);
				timings.record_task_failures(strategy, execution.failures.len());
			}

			if config.verify && bench.verify(&execution)? == Some(false) {
				timings.record_verification_failure(strategy);
			}

			if let (false, Some(path)) = (config.keep_files, &execution.path) {
				if let Err(e) = fs::remove_file(path) {
					warn!("Could not remove \"{}\": {}", path.display(), e);
				}
			}

			if !warmup {
				timings.record(TimingSample {
					strategy,
					millis: execution.elapsed.as_millis() as u64
				});
			}
		}
	}

	timings.summarise()
}

fn dedup_in_order(strategies: &mut Vec<Strategy>) {
	let mut seen = Vec::with_capacity(strategies.len());
	strategies.retain(|s| {
		if seen.contains(s) {
			false
		} else {
			seen.push(*s);
			true
		}
	});
}

/// Logs the ranking, fastest first
pub fn log_summaries(summaries: &[StrategySummary]) {
	for summary in summaries {
		info!("*****************************************");
		info!("{}:", summary.strategy);
		info!("Average time, ms:   {}", summary.average_millis);
		info!("Minimum time, ms:   {}", summary.min_millis);
		info!("All times list, ms: {:?}", summary.samples);
		if summary.task_failures > 0 {
			warn!("Failed tasks:       {}", summary.task_failures);
		}
		if summary.verification_failures > 0 {
			warn!("Failed read-backs:  {}", summary.verification_failures);
		}
	}
}

/// A record of a benchmark run, for writing out alongside the output files
#[derive(Serialize)]
pub struct Report<'a> {
	pub config: &'a BenchConfig,
	pub threads: usize,
	pub results: &'a [StrategySummary]
}

impl<'a> Report<'a> {
	pub fn new(config: &'a BenchConfig, threads: usize, results: &'a [StrategySummary]) -> Self {
		Report {
			config,
			threads,
			results
		}
	}

	/// Writes the report as tab-indented JSON to `report.json` in `dir_path`, returning the path written
	pub fn write(&self, dir_path: impl AsRef<Path>) -> Result<PathBuf, io::Error> {
		let mut buf = Vec::new();
		let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
		let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
		self.serialize(&mut ser)?;

		let filename = dir_path.as_ref().join("report.json");
		fs::write(&filename, buf)?;

		Ok(filename)
	}
}
