mod args;

use std::{fs, io::Write, path::Path, process::ExitCode};

use args::Args;
use clap::Parser;
use libwritebench::{harness::{self, Report}, pool, workbench::{config::BenchConfig, Strategy}};
use log::{debug, error, info};
use strum::IntoEnumIterator;

const DEFAULT_CONFIG: &str = "Writebench.toml";

fn main() -> ExitCode {
	let args = Args::parse();

	env_logger::Builder::new()
		.filter_level(args.verbose.log_level_filter())
		.format(|f, record| {
			let level_style = f.default_level_style(record.level());
			writeln!(f, "[{} {}/{}{}{}]: {}", f.timestamp(), record.target(), level_style.render(), record.level(), level_style.render_reset(), record.args())
		})
		.init();

	debug!("Args: {:?}", args);

	if args.list {
		let defaults = Strategy::defaults();
		for strategy in Strategy::iter() {
			println!("{}{}", strategy, if defaults.contains(&strategy) { "" } else { " (not run by default)" });
		}
		return ExitCode::SUCCESS;
	}

	let mut config = match load_config(args.config.as_deref()) {
		Some(config) => config,
		None => return ExitCode::FAILURE
	};
	apply_args(&mut config, args);

	if let Err(e) = config.validate() {
		error!("Invalid configuration: {}", e);
		return ExitCode::FAILURE;
	}

	debug!("Config: {:?}", config);

	let summaries = match harness::run(&config) {
		Ok(summaries) => summaries,
		Err(e) => {
			error!("Benchmark failed: {}", e);
			return ExitCode::FAILURE;
		}
	};

	harness::log_summaries(&summaries);

	if config.write_report {
		let threads = config.threads.unwrap_or_else(pool::default_thread_count);
		match Report::new(&config, threads, &summaries).write(&config.catalog) {
			Ok(path) => info!("Wrote report to \"{}\"", path.display()),
			Err(e) => error!("Could not write report to \"{}\": {}", config.catalog, e)
		}
	}

	ExitCode::SUCCESS
}

/// Reads the config file at `path`, or the default config file if there is one. A config file that was asked for but
/// couldn't be read is an error (None), whereas a missing default config file just means the default config
fn load_config(path: Option<&str>) -> Option<BenchConfig> {
	let path = match path {
		Some(path) => path,
		None if Path::new(DEFAULT_CONFIG).is_file() => DEFAULT_CONFIG,
		None => return Some(BenchConfig::default())
	};

	match fs::read_to_string(path) {
		Ok(config_string) => match toml::from_str(&config_string) {
			Ok(config) => Some(config),
			Err(e) => {
				error!("Error processing config file \"{}\": {}", path, e);
				None
			}
		},
		Err(e) => {
			error!("Could not open config file \"{}\": {}", path, e);
			None
		}
	}
}

/// Command line arguments override the config file
fn apply_args(config: &mut BenchConfig, args: Args) {
	if let Some(out_dir) = args.out_dir {
		config.catalog = out_dir;
	}
	if let Some(size) = args.size {
		config.file_size = size;
	}
	if let Some(seed) = args.seed {
		config.seed = seed;
	}
	if let Some(repetitions) = args.repetitions {
		config.repetitions = repetitions;
	}
	if let Some(warmup) = args.warmup {
		config.warmup = warmup;
	}
	if args.threads.is_some() {
		config.threads = args.threads;
	}
	if !args.strategies.is_empty() {
		config.strategies = args.strategies;
	}
	config.keep_files |= args.keep_files;
	config.verify |= args.verify;
	if args.no_report {
		config.write_report = false;
	}
}
