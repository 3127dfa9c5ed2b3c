use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tsd::chunk::split_into_chunks;
use tsd::completion::http::HttpCompletionClient;
use tsd::config::{self, TsdConfig};
use tsd::output::json::{self as json_out, StageOutput};
use tsd::output::table;
use tsd::pipeline::Pipeline;
use tsd::prompt::Prompts;
use tsd::segment::{render_chapter, SegmentPolicy};
use tsd::transcript::{self, asr};
use tsd::DigestError;

#[derive(Parser)]
#[command(
    name = "tsd",
    version,
    about = "Transcript Digest — segment, chunk and summarize meeting transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: ~/.tsd/config.toml)
    #[arg(long, global = true, env = "TSD_CONFIG")]
    config: Option<PathBuf>,

    /// Completion API key (overrides DEFAULT_API_KEY and config)
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Args)]
struct InputArgs {
    /// Transcript file
    path: Option<PathBuf>,

    /// Read from stdin
    #[arg(long)]
    stdin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw transcript chunk by chunk through the completion service
    Preprocess {
        #[command(flatten)]
        input: InputArgs,

        /// Lines per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Write result to file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Summarize a dated transcript by fixed-origin intervals
    Summary {
        #[command(flatten)]
        input: InputArgs,

        /// Interval length in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// Write result to file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate the meeting introduction with a timed chapter overview
    Intro {
        #[command(flatten)]
        input: InputArgs,

        /// Chapter length in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// Write result to file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Preview segmentation without calling the completion service
    Segments {
        #[command(flatten)]
        input: InputArgs,

        /// Policy: fixed (summary) or gap (chapters)
        #[arg(long, default_value = "gap")]
        policy: String,

        /// Interval length in minutes
        #[arg(long)]
        interval: Option<u32>,

        /// Print each segment's rendered text
        #[arg(long)]
        text: bool,
    },

    /// Preview chunking without calling the completion service
    Chunks {
        #[command(flatten)]
        input: InputArgs,

        /// Lines per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Convert speech model sentence JSON into transcript text
    FormatAsr {
        /// JSON file with sentence_info records
        path: PathBuf,

        /// Date header (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Write result to file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config template if none exists
    Init,
    /// Show effective configuration (secrets redacted)
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };
    let config = TsdConfig::load_from(&config_path)?;
    let mut settings = config.settings();

    match cli.command {
        Commands::Preprocess {
            input,
            chunk_size,
            out,
        } => {
            if let Some(size) = chunk_size {
                settings.chunk_size = size;
            }
            let text = read_input(&input)?;
            let pipeline = build_pipeline(&config, cli.api_key.as_deref(), settings)?;
            let result = pipeline.preprocess(&text).context("Preprocessing failed")?;
            json_out::emit(&StageOutput::Text(result), out.as_deref())?;
        }

        Commands::Summary {
            input,
            interval,
            out,
        } => {
            if let Some(minutes) = interval {
                settings.summary_interval_minutes = minutes;
            }
            let text = read_input(&input)?;
            let pipeline = build_pipeline(&config, cli.api_key.as_deref(), settings)?;
            let result = pipeline.summarize(&text).context("Summary failed")?;
            json_out::emit(&StageOutput::Json(result), out.as_deref())?;
        }

        Commands::Intro {
            input,
            interval,
            out,
        } => {
            if let Some(minutes) = interval {
                settings.intro_interval_minutes = minutes;
            }
            let text = read_input(&input)?;
            let pipeline = build_pipeline(&config, cli.api_key.as_deref(), settings)?;
            let result = pipeline.introduce(&text).context("Introduction failed")?;
            json_out::emit(&StageOutput::Json(result), out.as_deref())?;
        }

        Commands::Segments {
            input,
            policy,
            interval,
            text: show_text,
        } => {
            let policy = SegmentPolicy::from_str(&policy)
                .with_context(|| format!("Unknown policy: {policy}. Use: fixed, gap"))?;
            let minutes = interval.unwrap_or(match policy {
                SegmentPolicy::FixedOrigin => settings.summary_interval_minutes,
                SegmentPolicy::ElapsedGap => settings.intro_interval_minutes,
            });

            let text = read_input(&input)?;
            let parsed = transcript::parse_transcript(&text)?;
            let segments = policy.split(&parsed, minutes)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "policy": policy.as_str(),
                    "interval_minutes": minutes,
                    "entries": parsed.entries.len(),
                    "segments": segments,
                }))?;
            } else {
                println!("Parsed {} entries", parsed.entries.len());
                table::print_segments(&segments, policy, minutes);
                if show_text {
                    for (i, segment) in segments.iter().enumerate() {
                        println!(
                            "--- {} [{}]\n{}\n",
                            i + 1,
                            segment.clock_range(),
                            render_chapter(segment)
                        );
                    }
                }
            }
        }

        Commands::Chunks { input, chunk_size } => {
            let size = chunk_size.unwrap_or(settings.chunk_size);
            let text = read_input(&input)?;
            let chunks = split_into_chunks(&text, size)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "chunk_size": size,
                    "chunks": chunks,
                }))?;
            } else {
                table::print_chunks(&chunks);
            }
        }

        Commands::FormatAsr { path, date, out } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read: {}", path.display()))?;
            let sentences = match asr::parse_asr_json(&content) {
                Ok(sentences) => sentences,
                Err(DigestError::Parse) => bail!(
                    "No speaker sentences in {}. Was diarization enabled?",
                    path.display()
                ),
                Err(e) => {
                    return Err(e).with_context(|| format!("Invalid ASR JSON: {}", path.display()))
                }
            };
            let date = match date {
                Some(d) => chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date: {d}. Use YYYY-MM-DD"))?,
                None => chrono::Local::now().date_naive(),
            };
            let text = asr::format_sentences(date, &sentences);
            json_out::emit(&StageOutput::Text(text), out.as_deref())?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                if config::init_config(&config_path)? {
                    println!("Created {}", config_path.display());
                } else {
                    println!("Config already exists: {}", config_path.display());
                }
            }
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", config.display_redacted());
            }
        },
    }

    Ok(())
}

fn build_pipeline(
    config: &TsdConfig,
    api_key_flag: Option<&str>,
    settings: tsd::pipeline::PipelineSettings,
) -> Result<Pipeline<HttpCompletionClient>> {
    let api_key = config::resolve_credential(api_key_flag, config::API_KEY_ENV, &config.api)?;
    let prompts = load_prompts(&config.prompt_dir())?;
    let client = HttpCompletionClient::new(
        api_key,
        config.endpoint(),
        config.model(),
        config.timeout_secs(),
    )?;
    Ok(Pipeline::new(client, prompts, settings))
}

fn load_prompts(dir: &Path) -> Result<Prompts> {
    Prompts::load(dir).with_context(|| format!("Failed to load prompts from {}", dir.display()))
}

fn read_input(input: &InputArgs) -> Result<String> {
    if input.stdin {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read from stdin")?;
        return Ok(content);
    }

    match &input.path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display())),
        None => bail!("No input provided. Pass a file path or use --stdin."),
    }
}
