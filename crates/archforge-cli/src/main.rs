use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use archforge_core::{ChatOutcome, GenerateInput, GenerationEvent, Orchestrator, TemplateStore};

mod config;

use config::ArchforgeConfig;

const DEFAULT_CONFIG: &str = r#"# archforge configuration

[providers.gemini]
api_key = ""
model = "gemini-2.5-flash"

[providers.groq]
api_key = ""
model = "llama-3.1-8b-instant"

# [prompts]
# dir = "/path/to/template/overrides"
"#;

#[derive(Parser)]
#[command(name = "archforge")]
#[command(version)]
#[command(about = "archforge — LLM-orchestrated software architecture generation")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Generate an architecture from structured fields or a prompt
    Generate {
        /// Project name (structured input)
        #[arg(long)]
        project_name: Option<String>,

        /// Project description
        #[arg(long)]
        description: Option<String>,

        /// Use case
        #[arg(long)]
        use_case: Option<String>,

        /// Requirement (repeatable)
        #[arg(long = "requirement")]
        requirements: Vec<String>,

        /// Tech stack entry (repeatable)
        #[arg(long = "tech")]
        tech_stack: Vec<String>,

        /// Free-form prompt (mutually exclusive with structured fields)
        #[arg(long, conflicts_with = "project_name")]
        prompt: Option<String>,

        /// Stream the system design instead of waiting for the full run
        #[arg(long)]
        stream: bool,
    },

    /// Send a chat message; architecture requests are handed off
    Chat {
        /// The message to send
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init(),
        Commands::Config => cmd_config(&cli.config),
        Commands::Generate {
            project_name,
            description,
            use_case,
            requirements,
            tech_stack,
            prompt,
            stream,
        } => {
            let input = GenerateInput {
                project_name,
                description,
                use_case,
                requirements: (!requirements.is_empty()).then_some(requirements),
                tech_stack: (!tech_stack.is_empty()).then_some(tech_stack),
                prompt,
            };
            cmd_generate(&cli.config, input, stream).await
        }
        Commands::Chat { message } => cmd_chat(&cli.config, &message).await,
    }
}

fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        info!("Config already exists at {}", config_path.display());
    } else {
        std::fs::write(&config_path, DEFAULT_CONFIG)?;
        info!("Created default config at {}", config_path.display());
    }
    Ok(())
}

fn cmd_config(path: &Option<PathBuf>) -> Result<()> {
    let config = config::load(path.as_ref())?;
    println!("{config:#?}");
    Ok(())
}

fn build_orchestrator(config: &ArchforgeConfig) -> Result<Orchestrator> {
    let mut templates = TemplateStore::builtin();
    if let Some(dir) = &config.prompts.dir {
        let loaded = config::load_prompt_overrides(&mut templates, dir)?;
        info!("loaded {loaded} prompt overrides from {}", dir.display());
    }
    Ok(Orchestrator::new(config.provider_settings()).with_templates(templates))
}

async fn cmd_generate(path: &Option<PathBuf>, input: GenerateInput, stream: bool) -> Result<()> {
    let config = config::load(path.as_ref())?;
    let orchestrator = build_orchestrator(&config)?;

    if stream {
        let mut chunks = orchestrator.stream_system_design(&input).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            stdout.write_all(chunk?.as_bytes())?;
            stdout.flush()?;
        }
        println!();
    } else {
        let result = orchestrator.generate_architecture(&input).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    orchestrator.shutdown().await;
    Ok(())
}

async fn cmd_chat(path: &Option<PathBuf>, message: &str) -> Result<()> {
    let config = config::load(path.as_ref())?;
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match orchestrator.handle_chat_message(message).await? {
        ChatOutcome::Reply(reply) => println!("{reply}"),
        ChatOutcome::Generation(mut events) => {
            let mut stdout = std::io::stdout();
            while let Some(event) = events.next().await {
                match event? {
                    GenerationEvent::Handoff => info!("handed off to architecture generation"),
                    GenerationEvent::InputSpec { spec } => {
                        info!(project = %spec.project_name, "normalized spec");
                    }
                    GenerationEvent::SystemDesign { chunk } => {
                        stdout.write_all(chunk.as_bytes())?;
                        stdout.flush()?;
                    }
                    GenerationEvent::ComponentTree { tree } => {
                        println!("\n\n{}", serde_json::to_string_pretty(&tree)?);
                    }
                    GenerationEvent::Done => println!(),
                }
            }
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}
