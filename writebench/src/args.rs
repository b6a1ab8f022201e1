use clap::Parser;
use clap_verbosity_flag::InfoLevel;
use libwritebench::workbench::Strategy;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
	#[command(flatten)]
	pub verbose: clap_verbosity_flag::Verbosity<InfoLevel>,
	/// Path to the TOML config file. Defaults to "Writebench.toml" in the current working directory, if it exists
	#[arg(short, long)]
	pub config: Option<String>,
	/// The directory to write output files and the report to. Defaults to "results"
	#[arg(short, long)]
	pub out_dir: Option<String>,
	/// Number of bytes generated and written by each strategy
	#[arg(long)]
	pub size: Option<usize>,
	/// Seed of the generated byte sequence
	#[arg(long)]
	pub seed: Option<u64>,
	/// Number of times each strategy is run
	#[arg(short, long)]
	pub repetitions: Option<usize>,
	/// Number of leading repetitions to discard
	#[arg(short, long)]
	pub warmup: Option<usize>,
	/// Worker pool size. Defaults to half the available parallelism
	#[arg(short, long)]
	pub threads: Option<usize>,
	/// Run only this strategy. Can be given more than once, strategies run in the order given
	#[arg(short, long = "strategy")]
	pub strategies: Vec<Strategy>,
	/// Keep the output files instead of removing them after each run
	#[arg(long)]
	pub keep_files: bool,
	/// Read each output file back and check its contents (untimed)
	#[arg(long)]
	pub verify: bool,
	/// Don't write report.json to the output directory
	#[arg(long)]
	pub no_report: bool,
	/// List the available strategies and exit
	#[arg(long)]
	pub list: bool,
}
