// SPDX-License-Identifier: AGPL-3.0-or-later
//! semanticrd: applies semantic rules to custom resource documents

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use semanticrd::{
    config::STDIO_PATH,
    rules::{self, RuleSet},
    Config,
};

/// semanticrd: semantic rules for custom resources
///
/// Marks identifier and reference fields and extracts secrets from
/// Kubernetes-style custom resource documents.
#[derive(Parser, Debug)]
#[command(name = "semanticrd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "semanticrd.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply semantic rules to a stream of documents
    #[command(alias = "run")]
    Apply {
        /// Input YAML to process ("-" for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Semantics YAML to apply
        #[arg(short, long)]
        semantics: Option<PathBuf>,

        /// Output YAML to produce ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a semantic rules file
    Validate {
        /// Path to the rules file
        rules: PathBuf,
    },

    /// Show the rules that apply to one document kind
    Resolve {
        /// Path to the rules file
        rules: PathBuf,

        /// Document kind to resolve rules for
        #[arg(short, long)]
        kind: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show configuration
    Config,

    /// Initialize a new semanticrd configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        let level = Config::load_or_default(&cli.config)
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("semanticrd v{}", env!("CARGO_PKG_VERSION"));
            println!("Semantic rules for Kubernetes custom resources");
            Ok(())
        }

        Commands::Init { force } => init_config(&cli.config, force),

        Commands::Config => show_config(&cli.config),

        Commands::Validate { rules } => validate_rules(&rules),

        Commands::Resolve {
            rules,
            kind,
            format,
        } => resolve_rules(&rules, &kind, format),

        Commands::Apply {
            input,
            semantics,
            output,
        } => apply_semantics(&cli.config, input, semantics, output),
    }
}

/// Initialize a new configuration file
fn init_config(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let default_config = r#"# SPDX-License-Identifier: AGPL-3.0-or-later
# semanticrd configuration

input = "crds.yaml"
semantics = "semantics.yaml"
output = "crds-processes.yaml"

[logging]
level = "warn"
"#;

    std::fs::write(config_path, default_config)?;
    info!("Created configuration file: {}", config_path.display());
    println!("Created configuration file: {}", config_path.display());
    Ok(())
}

/// Show the current configuration
fn show_config(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("No configuration file found. Using defaults:");
        println!();
        println!("{}", toml::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Validate a rules file
fn validate_rules(rules_path: &Path) -> anyhow::Result<()> {
    info!("Validating semantic rules: {}", rules_path.display());

    let rules = rules::load_rules(rules_path)
        .with_context(|| format!("Failed to load semantic rules: {}", rules_path.display()))?;

    println!("Semantic rules '{}' are valid", rules_path.display());
    println!();
    println!("  Group: {}", rules.group);
    println!("  Versions: {}", rules.versions.join(", "));
    println!("  Global rules: {}", rules.globals.len());
    println!("  Override kinds: {}", rules.overrides.len());
    println!("  Total rules: {}", rules.rule_count());

    Ok(())
}

/// Print the resolved rules for one kind
fn resolve_rules(rules_path: &Path, kind: &str, format: OutputFormat) -> anyhow::Result<()> {
    let rules: RuleSet = rules::load_rules(rules_path)
        .with_context(|| format!("Failed to load semantic rules: {}", rules_path.display()))?;
    let resolved = rules.resolve_for(kind);

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "kind": kind,
                "versions": rules.versions,
                "rules": resolved.iter().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            if resolved.is_empty() {
                println!("No rules apply to kind {}", kind);
            } else {
                println!("Rules for kind {}:", kind);
                println!();
                for key in resolved.keys() {
                    println!("  - {}", key);
                }
            }
        }
    }

    Ok(())
}

/// Apply semantics to the configured input and write the configured output
fn apply_semantics(
    config_path: &Path,
    input: Option<PathBuf>,
    semantics: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_paths(input, semantics, output);
    config.validate()?;

    let rules = File::open(&config.semantics).with_context(|| {
        format!("Failed to open semantics file {}", config.semantics.display())
    })?;

    let reader: Box<dyn Read> = if config.input == Path::new(STDIO_PATH) {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&config.input)
            .with_context(|| format!("Failed to open input file {}", config.input.display()))?;
        Box::new(BufReader::new(file))
    };

    let to_stdout = config.output == Path::new(STDIO_PATH);
    let writer: Box<dyn Write> = if to_stdout {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(&config.output)
            .with_context(|| format!("Failed to create output file {}", config.output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let summary = semanticrd::apply(writer, reader, rules).with_context(|| {
        format!(
            "Failed to apply semantics {} on {}",
            config.semantics.display(),
            config.input.display()
        )
    })?;

    info!(
        output = %config.output.display(),
        documents = summary.documents_written,
        secrets = summary.secrets_generated,
        "Semantics applied"
    );
    if !to_stdout {
        println!("Semantics applied to {}", config.output.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["semanticrd", "version"]).unwrap();
        match cli.command {
            Commands::Version => {}
            _ => panic!("Expected Version command"),
        }
    }

    #[test]
    fn test_cli_apply_defaults_to_config() {
        let cli = Cli::try_parse_from(["semanticrd", "apply"]).unwrap();
        match cli.command {
            Commands::Apply {
                input,
                semantics,
                output,
            } => {
                assert!(input.is_none());
                assert!(semantics.is_none());
                assert!(output.is_none());
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_apply_flags() {
        let cli = Cli::try_parse_from([
            "semanticrd",
            "apply",
            "--input",
            "in.yaml",
            "-s",
            "rules.yaml",
            "-o",
            "-",
        ])
        .unwrap();
        match cli.command {
            Commands::Apply {
                input,
                semantics,
                output,
            } => {
                assert_eq!(input, Some(PathBuf::from("in.yaml")));
                assert_eq!(semantics, Some(PathBuf::from("rules.yaml")));
                assert_eq!(output, Some(PathBuf::from("-")));
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_cli_resolve_format() {
        let cli = Cli::try_parse_from([
            "semanticrd",
            "resolve",
            "rules.yaml",
            "--kind",
            "AtlasProject",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve { kind, format, .. } => {
                assert_eq!(kind, "AtlasProject");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["semanticrd", "-v", "config"]).unwrap();
        assert!(cli.verbose);
    }
}
