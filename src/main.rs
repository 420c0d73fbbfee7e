use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use t2i_bias::output::OutputSchema;
use t2i_bias::scoring::{Level, Metric};
use t2i_bias::store::ImageLabels;
use t2i_bias::BiasError;
use tracing_subscriber::EnvFilter;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 2;
const EXIT_OUTPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a model and write every artifact (default if no subcommand)
    Run,
    /// Turn per-image annotator labels into per-prompt distributions
    Tally {
        /// JSON file mapping prompt keys to per-image labels
        labels: PathBuf,
        /// Where to write the distribution file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a persisted score result
    Show {
        /// Path to a `<metric>_score_result.json` file
        path: PathBuf,
        /// Print one level's entries instead of the model summary
        #[arg(short, long, value_enum)]
        level: Option<Level>,
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Write a default config file
    Init {
        /// Target path (defaults to ~/.config/t2i-bias/config.yaml)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "t2i-bias")]
#[command(about = "Demographic bias scoring for text-to-image models", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to config file (defaults to ~/.config/t2i-bias/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model name, overrides the config
    #[arg(long, global = true)]
    model: Option<String>,

    /// Generated distributions file or shard directory
    #[arg(long, global = true)]
    generated: Option<PathBuf>,

    /// Output root directory
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Metric to compute (repeatable; defaults to the config's list)
    #[arg(long = "metric", global = true, value_enum)]
    metrics: Vec<Metric>,

    /// Artifact naming schema
    #[arg(long, global = true, value_enum)]
    schema: Option<OutputSchema>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let _ = tracing_subscriber::fmt()
        // RUST_LOG wins when set and valid
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let use_colors = t2i_bias::output::should_use_colors();

    let command = cli.command.unwrap_or(Commands::Run);
    match command {
        Commands::Init { path, force } => {
            match t2i_bias::config::write_default_config(path, force) {
                Ok(path) => {
                    println!("Wrote default config to {}", path.display());
                    std::process::exit(EXIT_SUCCESS);
                }
                Err(e) => {
                    eprintln!("Config error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::Tally { labels, output } => {
            let images: IndexMap<String, Vec<ImageLabels>> =
                match t2i_bias::store::loader::read_json_table("labels", &labels) {
                    Ok(images) => images,
                    Err(e) => {
                        eprintln!("Input error: {}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                };
            let distributions = t2i_bias::store::tally_prompts(images);
            if let Err(e) = t2i_bias::output::write_json_atomic(&output, &distributions) {
                eprintln!("Output error: {:#}", e);
                std::process::exit(EXIT_OUTPUT);
            }
            println!(
                "Tallied {} prompts into {}",
                distributions.len(),
                output.display()
            );
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Show { path, level, tsv } => {
            let result = match t2i_bias::output::load_score_result(&path) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Input error: {:#}", e);
                    std::process::exit(EXIT_INPUT);
                }
            };
            let text = match (level, tsv) {
                (Some(level), true) => t2i_bias::output::format_tsv(&result, level),
                (Some(level), false) => t2i_bias::output::format_level(&result, level, use_colors),
                (None, true) => t2i_bias::output::format_tsv(&result, Level::Model),
                (None, false) => {
                    t2i_bias::output::format_summary(std::slice::from_ref(&result), use_colors)
                }
            };
            println!("{}", text);
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Run => {}
    }

    // Load config, then apply command-line overrides
    let mut config = match t2i_bias::config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(generated) = cli.generated {
        config.generated = Some(generated);
    }
    if let Some(out) = cli.out {
        config.output.dir = out;
    }
    if !cli.metrics.is_empty() {
        config.metrics = cli.metrics;
    }
    if let Some(schema) = cli.schema {
        config.output.schema = schema;
    }

    if let Err(errors) = t2i_bias::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let report = match t2i_bias::run_benchmark(&config) {
        Ok(report) => report,
        Err(BiasError::InvalidConfig(errors)) => {
            eprintln!("Config errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_CONFIG);
        }
        Err(e) => {
            eprintln!("Input error: {}", e);
            std::process::exit(EXIT_INPUT);
        }
    };

    let manifest = match t2i_bias::write_report(&report, &config) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Output error: {:#}", e);
            std::process::exit(EXIT_OUTPUT);
        }
    };

    println!(
        "{}",
        t2i_bias::output::format_summary(&report.score_results(), use_colors)
    );
    println!(
        "\n{} artifacts in {} ({})",
        manifest.artifacts.len(),
        config.model_output_dir().display(),
        manifest.elapsed
    );
    std::process::exit(EXIT_SUCCESS);
}
