//! Main entry point for the Gen Studio client

use clap::{Args, Parser, Subcommand};
use gen_studio_client::{
    config::Settings,
    health::HealthProbe,
    GenerationForm, Outcome, Studio,
};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Prompt-to-image client for a streaming generation backend
#[derive(Parser, Debug)]
#[command(name = "gen-studio")]
#[command(about = "Generate images from prompts over a WebSocket backend", long_about = None)]
struct Cli {
    /// Settings file (TOML or YAML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend WebSocket URL, overriding configuration
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one image and exit
    Generate {
        /// Text prompt
        #[arg(short, long)]
        prompt: String,

        #[command(flatten)]
        form: FormArgs,
    },
    /// Read prompts and commands from the terminal
    Interactive {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Check whether the backend is up
    Health,
}

#[derive(Args, Debug)]
struct FormArgs {
    /// Negative prompt
    #[arg(short, long)]
    negative: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Sampling steps (8-40)
    #[arg(long)]
    steps: Option<u32>,

    /// Guidance scale (4.0-12.0)
    #[arg(long)]
    guidance: Option<f64>,

    /// Seed; pass an empty string to let the backend choose
    #[arg(long)]
    seed: Option<String>,

    /// Fill a blank seed with a random one
    #[arg(long)]
    lock_seed: bool,

    /// Replace the seed with a random one
    #[arg(long, conflicts_with = "lock_seed")]
    random_seed: bool,

    /// PNG/JPEG reference image
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Reference image strength (0.1-0.95)
    #[arg(long)]
    strength: Option<f64>,
}

impl FormArgs {
    async fn apply(&self, form: &mut GenerationForm) -> anyhow::Result<()> {
        if let Some(negative) = &self.negative {
            form.set_negative(negative.clone());
        }
        if let Some(width) = self.width {
            form.set_width(width);
        }
        if let Some(height) = self.height {
            form.set_height(height);
        }
        if let Some(steps) = self.steps {
            form.set_steps(steps);
        }
        if let Some(guidance) = self.guidance {
            form.set_guidance(guidance)?;
        }
        if let Some(seed) = &self.seed {
            form.set_seed(seed.clone());
        }
        if self.lock_seed {
            form.lock_seed();
        }
        if self.random_seed {
            form.randomize_seed();
        }
        if let Some(path) = &self.image {
            form.load_reference(path).await?;
        }
        if let Some(strength) = self.strength {
            form.set_strength(strength)?;
        }
        Ok(())
    }
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let (json, pretty) = if settings.logging.format == "json" {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    if let Some(url) = &cli.url {
        settings.backend.ws_url = url.clone();
        settings.validate()?;
    }

    init_logging(&settings);
    info!(url = %settings.backend.ws_url, "Starting Gen Studio client");

    match cli.command {
        Command::Generate { prompt, form } => {
            let mut studio = Studio::new(settings);
            studio.form_mut().set_prompt(prompt);
            form.apply(studio.form_mut()).await?;

            match studio.run_once().await? {
                Outcome::Saved(_) => Ok(()),
                Outcome::Cancelled => std::process::exit(130),
                Outcome::Reset => anyhow::bail!("Backend reset before producing an image"),
                Outcome::Disconnected(reason) => anyhow::bail!(
                    "Backend disconnected{}",
                    reason.map(|r| format!(": {}", r)).unwrap_or_default()
                ),
            }
        }
        Command::Interactive { form } => {
            let mut studio = Studio::new(settings);
            form.apply(studio.form_mut()).await?;
            studio
                .run_interactive(BufReader::new(tokio::io::stdin()))
                .await?;
            Ok(())
        }
        Command::Health => {
            let probe = HealthProbe::new(&settings.backend)?;
            let report = probe.check().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.ok {
                Ok(())
            } else {
                anyhow::bail!("Backend at {} reports not ok", probe.url())
            }
        }
    }
}
