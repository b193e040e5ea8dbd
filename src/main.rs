use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use sqa_flip::config::{Config, ScoreSettings};
use sqa_flip::error::ScoreError;
use sqa_flip::scoring::OptionAlphabet;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_OUTPUT: i32 = 1;
const EXIT_INPUT: i32 = 2;
const EXIT_JOIN: i32 = 3;
const EXIT_EMPTY: i32 = 4;
const EXIT_CONFIG: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a result file into a list of {image_id, caption} objects
    Captions {
        /// Line-delimited JSON predictions
        #[arg(long)]
        result_file: PathBuf,

        /// Where to write the caption list
        #[arg(long)]
        output_file: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "sqa-flip")]
#[command(
    about = "Score multiple-choice VQA predictions against attacker-flipped ground truth",
    long_about = None
)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/sqa-flip/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing problems.json
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Line-delimited JSON predictions
    #[arg(long)]
    result_file: Option<PathBuf>,

    /// JSON array of {id, new_gt} ground-truth overrides
    #[arg(long)]
    attack_file: Option<PathBuf>,

    /// Where to write the correct/incorrect analysis
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Where to write the aggregate result
    #[arg(long)]
    output_result: Option<PathBuf>,

    /// Dataset split name. Accepted for compatibility; scoring uses the attack file's ids.
    #[arg(long, default_value = "test")]
    split: String,

    /// Answer labels, one per character [default: ABCDE]
    #[arg(long, value_parser = clap::value_parser!(OptionAlphabet))]
    options: Option<OptionAlphabet>,

    /// Seed for the random fallback (random per run if unset)
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// Flags given on the command line, as a config layer
    fn overrides(&self) -> Config {
        Config {
            base_dir: self.base_dir.clone(),
            result_file: self.result_file.clone(),
            attack_file: self.attack_file.clone(),
            output_file: self.output_file.clone(),
            output_result: self.output_result.clone(),
            options: self.options.as_ref().map(|o| o.to_string()),
            seed: self.seed,
        }
    }
}

fn exit_code(err: &ScoreError) -> i32 {
    match err {
        ScoreError::Input { .. } => EXIT_INPUT,
        ScoreError::Join { .. } => EXIT_JOIN,
        ScoreError::EmptyResult => EXIT_EMPTY,
    }
}

/// Exit code for a command-line parse failure. Help and version are successes;
/// every other usage error is a config error.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
        _ => EXIT_CONFIG,
    }
}

fn run_captions(result_file: PathBuf, output_file: PathBuf) -> i32 {
    let predictions = match sqa_flip::dataset::load_predictions(&result_file) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    let captions = match sqa_flip::captions::convert_captions(&predictions) {
        Ok(c) => c,
        Err(fault) => {
            let e = ScoreError::input(&result_file, fault);
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    if let Err(e) = sqa_flip::output::write_json_pretty(&output_file, &captions) {
        eprintln!("Output error: {:#}", e);
        return EXIT_OUTPUT;
    }

    tracing::debug!(
        captions = captions.len(),
        path = %output_file.display(),
        "Wrote captions"
    );
    EXIT_SUCCESS
}

fn run_score(cli: &Cli) -> i32 {
    let start_time = Instant::now();

    let file_config = match sqa_flip::config::load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let settings = match ScoreSettings::from_config(file_config.merge(cli.overrides())) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    tracing::debug!(split = %cli.split, "Split name is not used; the attack file defines the split");

    let seed = sqa_flip::run::resolve_seed(settings.seed);
    tracing::debug!(seed, options = %settings.alphabet, "Resolved run settings");
    let mut rng = sqa_flip::run::fallback_rng(seed);

    let report = match sqa_flip::run::load_and_score(&settings, &mut rng) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    let use_colors = sqa_flip::output::should_use_colors();
    println!(
        "{}",
        sqa_flip::output::format_summary(&report.result, use_colors)
    );

    if let Err(e) = sqa_flip::run::write_reports(&settings, &report) {
        eprintln!("Output error: {:#}", e);
        return EXIT_OUTPUT;
    }

    tracing::debug!(elapsed = ?start_time.elapsed(), "Done");
    EXIT_SUCCESS
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };
    sqa_flip::logging::init(cli.verbose);

    let code = match &cli.command {
        Some(Commands::Captions {
            result_file,
            output_file,
        }) => run_captions(result_file.clone(), output_file.clone()),
        None => run_score(&cli),
    };

    std::process::exit(code);
}
