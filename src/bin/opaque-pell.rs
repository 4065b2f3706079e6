//! Command line front-end: generate disguised Pell constraints and keep those
//! on which Z3 times out.

// Reports are the program's output.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::Parser;
use opaque_pell::backend::z3::Z3Procedure;
use opaque_pell::{
    EntryRange, GeneratorConfig, GeneratorMode, PellError, Pipeline, SolverStrategy,
    SubmissionForm,
};

#[derive(Parser, Debug)]
#[command(name = "opaque-pell", version, about)]
struct Opt {
    /// Seed set: `simple` (D = 1) or `complete` (D = 1, 4, ..., 49)
    #[arg(short, long, default_value = "complete")]
    mode: String,
    /// Per-constraint solver budget in seconds
    #[arg(short, long, default_value_t = 60.0)]
    timeout: f64,
    /// Smallest sampled matrix entry
    #[arg(long, default_value_t = -10, allow_negative_numbers = true)]
    entry_min: i64,
    /// Largest sampled matrix entry
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    entry_max: i64,
    /// Extra disguises per seed until one times out
    #[arg(short, long, default_value_t = 0)]
    retries: u32,
    /// Fixed RNG seed for reproducible matrices
    #[arg(short, long)]
    seed: Option<u64>,
    /// Largest root k in complete mode (D = k^2)
    #[arg(long, default_value_t = 7)]
    max_root: u32,
    /// Draw seeds with a random square D in [LOW, HIGH] instead of the mode's set
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
    d_range: Option<Vec<i64>>,
    /// Number of seeds drawn with --d-range
    #[arg(long, default_value_t = 1, requires = "d_range")]
    count: u32,
    /// Submit the expanded quadratic form instead of the product form
    #[arg(long)]
    expanded: bool,
    /// Use Z3's default solver instead of the qfnia tactic
    #[arg(long)]
    default_strategy: bool,
    /// Cap Z3 memory use, in megabytes
    #[arg(long)]
    max_memory: Option<u32>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opt {
    fn config(&self) -> Result<GeneratorConfig, PellError> {
        let config = GeneratorConfig {
            mode: self.mode.parse::<GeneratorMode>()?,
            entry_range: EntryRange::new(self.entry_min, self.entry_max)?,
            retries_per_seed: self.retries,
            rng_seed: self.seed,
            max_root: self.max_root,
            submission: if self.expanded {
                SubmissionForm::Expanded
            } else {
                SubmissionForm::Product
            },
            strategy: if self.default_strategy {
                SolverStrategy::Default
            } else {
                SolverStrategy::NonlinearInteger
            },
            ..GeneratorConfig::default()
        }
        .with_timeout_secs(self.timeout)?;
        let config = match self.d_range.as_deref() {
            Some(&[low, high]) => config.with_d_range(low..=high, self.count),
            _ => config,
        };
        config.validate()?;
        Ok(config)
    }

    fn procedure(&self) -> Z3Procedure {
        match self.max_memory {
            Some(megabytes) => Z3Procedure::new().with_max_memory_mb(megabytes),
            None => Z3Procedure::new(),
        }
    }

    fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

fn run(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    // logs go to stderr so stdout carries only reports
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opt.log_level())
            .with_writer(std::io::stderr)
            .finish(),
    )?;
    tracing_log::LogTracer::init()?;

    let config = opt.config()?;
    let mut pipeline = Pipeline::from_config(config, opt.procedure())?;

    if opt.json {
        let summary = pipeline.run()?;
        match summary.to_json_pretty() {
            Some(json) => println!("{}", json),
            None => return Err("failed to serialize run summary".into()),
        }
    } else {
        let summary = pipeline.run_with(|report| println!("{}", report))?;
        if summary.qualifying.is_empty() {
            println!("\n{}", summary);
        } else {
            println!(
                "\n{} qualifying constraint(s) emitted",
                summary.qualifying_count()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let opt = Opt::parse();
    match run(&opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
