//! Validator Config CLI
//!
//! View and manage staging validator configuration.

use clap::{Parser, Subcommand};
use staging_validator::ValidatorConfig;

#[derive(Parser)]
#[command(name = "stage-config")]
#[command(about = "View and manage staging validator configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: validator.toml)
        #[arg(short, long, default_value = "validator.toml")]
        output: String,
    },

    /// Validate configuration, including every schema it registers
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = ValidatorConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Staging Validator Configuration\n");
                println!("Input:");
                println!("  Delimiter: {:?}", cfg.input.delimiter);
                println!("  File masks: {:?}", cfg.input.file_masks);

                println!("\nOutput:");
                println!("  Directory: {:?}", cfg.output.directory);
                println!("  Accepted prefix: {}", cfg.output.accepted_prefix);
                println!("  Rejected prefix: {}", cfg.output.rejected_prefix);
                println!("  Reasons column: {:?}", cfg.output.reasons_column);
                println!("  Reason separator: {:?}", cfg.output.reason_separator);

                println!("\nRegistry:");
                println!("  Path: {:?}", cfg.registry.path);

                if !cfg.schemas.is_empty() {
                    println!("\nInline schemas:");
                    for schema in &cfg.schemas {
                        println!("  {} ({} columns)", schema.name, schema.columns.len());
                    }
                }
            }
        }

        Commands::Init { output } => {
            let cfg = ValidatorConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => {
            let checked = ValidatorConfig::load_from(config.as_deref())
                .map_err(anyhow::Error::from)
                .and_then(|cfg| {
                    cfg.split_options()?;
                    let registry = cfg.build_registry()?;
                    Ok((cfg, registry))
                });

            match checked {
                Ok((cfg, registry)) => {
                    println!("✅ Configuration is valid");
                    println!("   Delimiter: {:?}", cfg.input.delimiter);
                    println!("   Registry: {:?}", cfg.registry_path());
                    println!("   Schemas: {}", registry.names().join(", "));
                }
                Err(e) => {
                    eprintln!("❌ Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
