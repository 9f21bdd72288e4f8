use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use weibodcast::cli::{Cli, Commands, ConfigAction};
use weibodcast::config::{CONFIG_TEMPLATE, Config};
use weibodcast::output::{TerminalSink, format_script};
use weibodcast::pipeline::GenerateRequest;
use weibodcast::server::{build_pipeline, run_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run_server(config).await?;
        }
        #[cfg(feature = "client")]
        Commands::Generate {
            user_id,
            sample,
            server,
            output,
        } => {
            handle_generate(&user_id, &sample, &server, &output, cli.quiet).await?;
        }
        Commands::Run {
            user_id,
            sample,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            handle_run(config, &user_id, &sample, &output, cli.quiet).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "weibodcast",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the CLI flags.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,weibodcast={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/weibodcast/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied last.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

/// Read the guest voice sample and encode it for the wire.
fn read_sample(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read voice sample {}", path.display()))?;
    Ok(BASE64.encode(bytes))
}

fn write_podcast(path: &Path, audio: &[u8]) -> Result<()> {
    std::fs::write(path, audio)
        .with_context(|| format!("Failed to write podcast to {}", path.display()))?;
    eprintln!(
        "{} {} ({} bytes)",
        "Saved podcast to".green(),
        path.display(),
        audio.len()
    );
    Ok(())
}

/// Remote run: Progress Channel, then artifact retrieval.
#[cfg(feature = "client")]
async fn handle_generate(
    user_id: &str,
    sample: &Path,
    server: &str,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    use weibodcast::client::RemoteClient;
    use weibodcast::output::render_event;
    use weibodcast::pipeline::ProgressEvent;

    let request = GenerateRequest::new(user_id, read_sample(sample)?);
    let client = RemoteClient::new(server)?;

    let completed = client
        .generate(&request, |event| {
            if !quiet || matches!(event, ProgressEvent::Error { .. }) {
                render_event(event);
            }
        })
        .await?;

    let audio = client.fetch_audio(&completed.audio_id).await?;
    write_podcast(output, &audio)?;
    println!("{}", format_script(&completed.script));
    Ok(())
}

/// In-process run against the real upstream services.
async fn handle_run(
    config: Config,
    user_id: &str,
    sample: &Path,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    config.validate()?;
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing credentials: {} (set them in the config file or environment)",
            missing.join(", ")
        );
    }

    let request = GenerateRequest::new(user_id, read_sample(sample)?);
    let pipeline = build_pipeline(&config)?;
    let completed = pipeline.run(request, &TerminalSink::new(quiet)).await?;

    let audio = pipeline
        .store()
        .get(&completed.audio_id)
        .context("Finished audio missing from store")?;
    write_podcast(output, &audio)?;
    println!("{}", format_script(&completed.script));
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            println!("{}", config.get_value_by_path(&key)?);
        }
        ConfigAction::List { section } => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            match section {
                Some(section) => print!("{}", config.display_section(&section)?),
                None => print!("{}", config.to_toml()?),
            }
        }
        ConfigAction::Dump => {
            print!("{CONFIG_TEMPLATE}");
        }
        ConfigAction::Path => {
            let exists = if config_path.exists() {
                "exists".green().to_string()
            } else {
                "not found, using defaults".yellow().to_string()
            };
            println!("{} ({})", config_path.display(), exists);
        }
    }
    Ok(())
}
