use clap::{Parser, Subcommand};
use std::path::PathBuf;

const EXIT_SUCCESS: i32 = 0;
const EXIT_DATA: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute all indices for the corpus (default if no subcommand)
    Compute {
        /// Emit the full result set as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check the analysis config, then report label coverage for the data
    Validate,
}

#[derive(Parser, Debug)]
#[command(name = "discourse-index")]
#[command(about = "Composite rhetorical indices from annotated transcripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the analysis config (defaults to ./analysis.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the annotation file (defaults to the first match in data/)
    #[arg(short, long, global = true)]
    data: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Compute { json: false });

    // Load the per-corpus analysis config
    let config_path = cli.config.map(PathBuf::from);
    let config = match discourse_index::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate the registry at startup, reporting every error at once
    if let Err(errors) = discourse_index::index::validate_analysis(&config) {
        eprintln!("Analysis config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    if cli.verbose {
        eprintln!(
            "Corpus '{}': {} dimensions, {} indices",
            config.corpus,
            config.dimensions.len(),
            config.indices.len()
        );
    }

    // Locate the annotation file
    let data_path = match cli.data.map(PathBuf::from) {
        Some(path) => Some(path),
        None => match discourse_index::records::find_data_file() {
            Ok(path) => Some(path),
            Err(e) => {
                // validate can still check the config without data
                if matches!(command, Commands::Validate) {
                    None
                } else {
                    eprintln!("Data error: {}", e);
                    std::process::exit(EXIT_DATA);
                }
            }
        },
    };

    let corpus = match &data_path {
        Some(path) => {
            if cli.verbose {
                eprintln!("Loading annotations from {}", path.display());
            }
            match discourse_index::records::load_records(path) {
                Ok(corpus) => Some(corpus),
                Err(e) => {
                    eprintln!("Data error: {}", e);
                    std::process::exit(EXIT_DATA);
                }
            }
        }
        None => None,
    };

    if let Some(corpus) = &corpus {
        if corpus.dropped > 0 {
            eprintln!("Warning: {} malformed rows dropped", corpus.dropped);
        }
        if cli.verbose {
            eprintln!("Loaded {} records", corpus.records.len());
        }
    }

    match command {
        Commands::Compute { json } => {
            let Some(corpus) = corpus else {
                // unreachable: compute exits above when no data resolves
                std::process::exit(EXIT_DATA);
            };
            let results = match discourse_index::index::compute_all(&corpus.records, &config) {
                Ok(results) => results,
                Err(e) => {
                    eprintln!("Computation error: {}", e);
                    std::process::exit(EXIT_DATA);
                }
            };

            for warning in &results.warnings {
                eprintln!("Warning: {}", warning);
            }
            for failure in &results.failures {
                eprintln!("Index '{}' failed: {}", failure.index, failure.error);
            }

            if json {
                match serde_json::to_string_pretty(&results) {
                    Ok(payload) => println!("{}", payload),
                    Err(e) => {
                        eprintln!("Failed to serialize results: {}", e);
                        std::process::exit(EXIT_DATA);
                    }
                }
            } else {
                let use_colors = discourse_index::output::should_use_colors();
                if cli.verbose {
                    for result in &results.results {
                        println!(
                            "{}",
                            discourse_index::output::format_index_detail(result, use_colors)
                        );
                        println!();
                    }
                    eprintln!("Total: {} records", results.total_records);
                } else {
                    println!(
                        "{}",
                        discourse_index::output::format_results_table(&results, use_colors)
                    );
                }
            }
        }
        Commands::Validate => {
            println!(
                "Config OK: {} indices over {} dimensions",
                config.indices.len(),
                config.dimensions.len()
            );

            let Some(corpus) = corpus else {
                println!("No annotation file found; skipped data coverage check.");
                std::process::exit(EXIT_SUCCESS);
            };

            let report = discourse_index::index::vocabulary_report(
                &corpus.records,
                &config.dimensions,
            );
            let mut drifted = false;
            for coverage in &report {
                println!(
                    "{}: {} annotated, {} missing",
                    coverage.dimension, coverage.annotated, coverage.missing
                );
                if cli.verbose {
                    for (label, count) in &coverage.labels {
                        println!("  {}: {}", label, count);
                    }
                }
                for (label, count) in &coverage.unknown {
                    drifted = true;
                    println!("  UNKNOWN label '{}' ({} mentions)", label, count);
                }
            }

            if drifted {
                eprintln!("Vocabulary drift detected; indices over these dimensions will fail.");
                std::process::exit(EXIT_DATA);
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}
