//! playgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use clap::{Parser, ValueEnum};
use playgen_core::{
    backend::Backend, parse_override, parse_overrides, Config, Generator, GeneratorRegistry,
    OpenApiContext,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "playgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate a server project from a Swagger/OpenAPI spec
    Generate {
        /// Path or URL to the spec (YAML or JSON)
        ///
        /// Example: --spec petstore.yaml
        /// Example: --spec https://petstore.swagger.io/v2/swagger.json
        #[arg(long, short = 'i')]
        spec: Option<String>,
        /// Output directory for generated code
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,
        /// Generator to use (see `playgen list`)
        #[arg(long, short = 'g')]
        generator: Option<String>,
        /// Directory with template overrides
        #[arg(long, short = 't')]
        template_dir: Option<PathBuf>,
        /// YAML run configuration; flags take precedence over its values
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Generator option override (`key=value`, value taken verbatim), may be repeated
        #[arg(long = "property", short = 'p', value_name = "KEY=VALUE")]
        properties: Vec<String>,
        /// Comma separated option overrides (`a=1,b=2`)
        #[arg(long, value_name = "PAIRS")]
        additional_properties: Option<String>,
        /// Server URL used when the spec doesn't declare one
        #[arg(long)]
        base_url: Option<url::Url>,
        /// Reject overrides for options the generator doesn't declare
        #[arg(long)]
        strict: bool,
        /// Treat any boolean override other than `true` as `false`
        #[arg(long)]
        lenient_booleans: bool,
        /// Print the files that would be written and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the options a generator accepts
    ConfigHelp {
        /// Generator to describe
        #[arg(long, short = 'g', default_value = playgen_core::backend::scala_play::NAME)]
        generator: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List the available generators
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml,
}

#[derive(Serialize)]
struct GeneratorHelp<'a> {
    name: &'a str,
    tag: String,
    help: &'a str,
    options: Vec<&'a playgen_core::CliOption>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            spec,
            output_dir,
            generator,
            template_dir,
            config,
            properties,
            additional_properties,
            base_url,
            strict,
            lenient_booleans,
            dry_run,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => {
                    let spec = spec
                        .clone()
                        .context("--spec is required when no --config is given")?;
                    let output = output_dir.clone().unwrap_or_else(|| PathBuf::from("generated"));
                    Config::new(project_name(&output), spec, output.to_string_lossy())
                }
            };

            if let Some(spec) = spec {
                config.spec_path = spec;
            }
            if let Some(output) = output_dir {
                config.output_dir = output.to_string_lossy().to_string();
            }
            if let Some(generator) = generator {
                config.generator = generator;
            }
            if let Some(dir) = template_dir {
                config.template_dir = Some(dir.to_string_lossy().to_string());
            }
            if base_url.is_some() {
                config.base_url = base_url;
            }
            config.strict_options |= strict;
            config.lenient_booleans |= lenient_booleans;

            for property in &properties {
                let (key, value) = parse_override(property).context("Invalid option override")?;
                config.additional_properties.insert(key, value);
            }
            let overrides =
                parse_overrides(additional_properties.iter()).context("Invalid option override")?;
            config.additional_properties.extend(overrides);

            if dry_run {
                dry_run_plan(&config).await
            } else {
                tracing::info!(
                    "Generating {} from {} into {}",
                    config.generator,
                    config.spec_path,
                    config.output_dir
                );
                let summary = playgen_core::generate(&config)
                    .await
                    .context("Generation failed")?;
                for skipped in &summary.skipped {
                    tracing::warn!("Skipped {}", skipped);
                }
                println!(
                    "Generated {} files ({} models, {} APIs) in {}",
                    summary.files.len(),
                    summary.models,
                    summary.apis,
                    config.output_dir
                );
                Ok(())
            }
        }
        Commands::ConfigHelp { generator, format } => {
            let backend = GeneratorRegistry::with_builtins().create(&generator)?;
            print!("{}", describe(&backend, format)?);
            Ok(())
        }
        Commands::List => {
            for backend in GeneratorRegistry::with_builtins().backends()? {
                let info = backend.info();
                println!("{} ({}): {}", info.name, info.tag, info.help);
            }
            Ok(())
        }
    }
}

/// Plan and render without touching the output directory
async fn dry_run_plan(config: &Config) -> anyhow::Result<()> {
    let backend = GeneratorRegistry::with_builtins().create(&config.generator)?;
    let generator = Generator::new(
        backend,
        &config.additional_properties,
        config.override_policy(),
        config.template_dir.as_deref().map(Path::new),
    )
    .await?;
    let spec = OpenApiContext::from_file_or_url(&config.spec_path)
        .await
        .with_context(|| format!("Failed to load spec {}", config.spec_path))?;

    let base_url = config.base_url.as_ref().map(|u| u.as_str());
    let plan = generator.plan_with_base_url(&spec, base_url)?;
    generator.render(&plan.manifest)?;
    for destination in plan.manifest.destinations() {
        println!("{}", destination);
    }
    for skipped in &plan.skipped {
        tracing::warn!("Would skip {}", skipped);
    }
    Ok(())
}

fn describe(backend: &Backend, format: Format) -> anyhow::Result<String> {
    let info = backend.info();
    let help = GeneratorHelp {
        name: info.name,
        tag: info.tag.to_string(),
        help: info.help,
        options: backend.options().cli_options().collect(),
    };
    let out = match format {
        Format::Json => serde_json::to_string_pretty(&help)? + "\n",
        Format::Yaml => serde_yaml::to_string(&help)?,
        Format::Text => {
            let mut out = format!("{}\n\n{}\n\nCONFIG OPTIONS\n", info.name, info.help);
            for option in &help.options {
                out.push_str(&format!(
                    "\t{}\n\t    {} ({}, default: {})\n\n",
                    option.name, option.description, option.kind, option.default
                ));
            }
            out
        }
    };
    Ok(out)
}

fn project_name(output: &Path) -> String {
    output
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "playgen".to_string())
}
