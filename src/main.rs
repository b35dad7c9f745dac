use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use translify::core::{print_error_message, read_input, translate_document, write_output};
use translify::core::{TranslifyError, TranslifyOptions};
use translify::env::{core::LogLevel, EnvVar};
use translify::network::LocalManifestProvider;
use translify::translation::{ConfigManager, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "translify", version, about = "Incremental in-place translation of HTML documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate an HTML document into the requested language
    Translate(TranslateArgs),
    /// Print the manifest built from a project file and a locales directory
    Manifest(ManifestArgs),
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// HTML file to translate, `-` for stdin
    input: String,

    /// Target language code
    #[arg(short, long)]
    lang: Option<String>,

    /// Write the result to FILE instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Manifest URL
    #[arg(short, long, conflicts_with = "project")]
    manifest: Option<String>,

    /// Project file declaring default language, languages and terms
    #[arg(short, long, requires = "locales")]
    project: Option<String>,

    /// Directory holding one `<code>.json` dictionary per language
    #[arg(long)]
    locales: Option<String>,

    /// Charset of the input document
    #[arg(short, long)]
    encoding: Option<String>,

    /// Keep dictionaries in memory only
    #[arg(long)]
    no_storage: bool,
}

#[derive(Args, Debug)]
struct ManifestArgs {
    #[arg(short, long)]
    project: String,

    #[arg(short, long)]
    locales: String,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::get_or_default("info".to_string())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &TranslateArgs) -> Result<RuntimeConfig, TranslifyError> {
    let manager = match &args.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();

    if let Some(project) = &args.project {
        config.project_file = Some(project.clone());
        config.manifest_url = None;
    }
    if let Some(locales) = &args.locales {
        config.locales_dir = locales.clone();
    }
    if let Some(manifest) = &args.manifest {
        config.manifest_url = Some(manifest.clone());
        config.project_file = None;
    }
    if args.no_storage {
        config.storage = translify::translation::StorageBackend::Memory;
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), TranslifyError> {
    match cli.command {
        Command::Translate(args) => {
            let options = TranslifyOptions {
                config: load_config(&args)?,
                language: args.lang.clone(),
                input_encoding: args.encoding.clone(),
            };

            let input = read_input(&args.input)?;
            let (output, stats) = translate_document(&input, &options).await?;
            write_output(args.output.as_deref(), &output)?;

            tracing::info!(
                "完成: 语言 {}, {} 处改写, 字典请求 {} 次",
                stats.current_language,
                stats.rewrites,
                stats.cache.fetches
            );
        }
        Command::Manifest(args) => {
            let manifest = LocalManifestProvider::new(&args.project, &args.locales)
                .build()
                .await?;
            let json = serde_json::to_string_pretty(&manifest)
                .map_err(|e| TranslifyError::new(&e.to_string()))?;
            write_output(None, format!("{json}\n").as_bytes())?;
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    if let Err(e) = run(Cli::parse()).await {
        print_error_message(&format!("Error: {e}"));
        process::exit(1);
    }
}
