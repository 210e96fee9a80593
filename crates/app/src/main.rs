use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use media_session_core::{
    descriptor, tokenizer, AppConfig, ErrorKind, ErrorReply, FileProfileStore, LoopControl,
    MediaEngine, MemoryEngine, ProfileMode, ProfileSource, Reply, Request, SessionService,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

fn main() -> media_session_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.profile_dir)?;

    match cli.command {
        Commands::Serve { engine } => run_serve(engine, config),
        Commands::Inspect { mode } => run_inspect(mode.into(), &config),
    }
}

fn load_config(
    path: Option<&PathBuf>,
    profile_dir: Option<PathBuf>,
) -> media_session_core::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = profile_dir {
        config.profiles.directory = dir;
    }
    Ok(config)
}

fn run_serve(engine: EngineKind, config: AppConfig) -> media_session_core::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match engine {
        EngineKind::Memory => runtime.block_on(serve(MemoryEngine::new(), config)),
        #[cfg(feature = "gstreamer")]
        EngineKind::Gstreamer => {
            let engine = media_session_core::GstEngine::new()?;
            runtime.block_on(serve(engine, config))
        }
        #[cfg(not(feature = "gstreamer"))]
        EngineKind::Gstreamer => Err(media_session_core::EngineError::backend(
            "this build does not include the gstreamer engine",
        )
        .into()),
    }
}

/// Reads one JSON request per stdin line and answers with one JSON line.
/// Engine notifications are polled on the same loop between requests.
async fn serve<E: MediaEngine>(engine: E, config: AppConfig) -> media_session_core::Result<()> {
    tracing::info!(
        service = %config.service.name,
        object_path = %config.service.object_path,
        profiles = ?config.profiles.directory,
        "ready to serve requests"
    );

    let profiles = FileProfileStore::new(&config.profiles);
    let mut service = SessionService::new(engine, profiles, &config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut ticker =
        tokio::time::interval(Duration::from_millis(config.session.poll_interval_ms.max(1)));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("request stream closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let reply = match serde_json::from_str::<Request>(line) {
                    Ok(request) => service.handle(request),
                    Err(err) => {
                        tracing::warn!(error = %err, "undecodable request");
                        Reply {
                            ok: false,
                            error: Some(ErrorReply {
                                kind: ErrorKind::ParseError,
                                message: format!("invalid request: {err}"),
                            }),
                            status: service.status(),
                        }
                    }
                };

                stdout.write_all(&encode_reply(&reply)?).await?;
                stdout.flush().await?;
            }
            _ = ticker.tick() => {
                if service.poll() == LoopControl::Quit {
                    tracing::warn!("stopping after pipeline error");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    service.shutdown();
    Ok(())
}

/// Renders a reply as one newline-terminated JSON line. Encoding failures
/// are reported as I/O errors on the reply stream.
fn encode_reply(reply: &Reply) -> media_session_core::Result<Vec<u8>> {
    let mut encoded = serde_json::to_vec(reply).map_err(std::io::Error::from)?;
    encoded.push(b'\n');
    Ok(encoded)
}

fn run_inspect(mode: ProfileMode, config: &AppConfig) -> media_session_core::Result<()> {
    let store = FileProfileStore::new(&config.profiles);
    tracing::info!(%mode, path = ?store.path_for(mode), "inspecting profile");

    let raw = store.load(mode)?;
    let tokens = tokenizer::split(&raw, config.profiles.delimiter)?;
    let descriptor = descriptor::build_with_limit(tokens, config.session.element_limit())?;

    let rendered = serde_json::to_string_pretty(&descriptor).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Remote-controlled record/playback session daemon",
    long_about = None
)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the record and playback profiles.
    #[arg(long, global = true)]
    profile_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve Record/Play/ChangeState requests read as JSON lines from stdin.
    Serve {
        /// Media engine backing the pipelines.
        #[arg(long, value_enum, default_value_t = EngineKind::Memory)]
        engine: EngineKind,
    },
    /// Parse a profile and print the resulting element chain.
    Inspect {
        #[arg(value_enum)]
        mode: ModeArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EngineKind {
    Memory,
    Gstreamer,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Record,
    Playback,
}

impl From<ModeArg> for ProfileMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Record => ProfileMode::Record,
            ModeArg::Playback => ProfileMode::Playback,
        }
    }
}
