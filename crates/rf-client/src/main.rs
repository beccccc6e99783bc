use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use rf_client::{RelayClient, Session, WorkflowEvent, load_reference_image};
use rf_core::prompts::{TEMPLATES, find_template};
use rf_core::{AdvanceRule, WorkflowStage};
use tokio::sync::mpsc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(about = "Generate a short video from a prompt and an optional reference image")]
#[command(version)]
struct Cli {
    /// Relay base URL
    #[arg(long, default_value = "http://localhost:5000")]
    server: String,

    /// Scene description (up to 500 characters)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Use a scene template's description as the prompt
    #[arg(short, long, conflicts_with = "prompt")]
    template: Option<String>,

    /// Reference image to guide generation
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Abort relay requests that take longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Hand the finished video to the 3D step
    #[arg(long)]
    proceed: bool,

    /// What moves the workflow past the prompt stage
    #[arg(long, value_enum, default_value_t = RuleArg::PromptAndImage)]
    advance_rule: RuleArg,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    ImageUpload,
    PromptEntered,
    PromptAndImage,
}

impl From<RuleArg> for AdvanceRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::ImageUpload => AdvanceRule::ImageUpload,
            RuleArg::PromptEntered => AdvanceRule::PromptEntered,
            RuleArg::PromptAndImage => AdvanceRule::PromptAndImage,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let prompt = match (&cli.prompt, &cli.template) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(name)) => match find_template(name) {
            Some(template) => template.description.to_string(),
            None => {
                let known: Vec<_> = TEMPLATES.iter().map(|t| t.name).collect();
                bail!("Unknown template {name:?}; available: {}", known.join(", "));
            }
        },
        (None, None) => bail!("Provide --prompt or --template"),
    };

    let client = match cli.timeout_secs {
        Some(secs) => RelayClient::with_timeout(&cli.server, Duration::from_secs(secs))?,
        None => RelayClient::new(&cli.server)?,
    };
    if let Err(e) = client.health().await {
        warn!("Relay health check failed: {e}");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let mut session = Session::new(client, cli.advance_rule.into()).with_events(tx);

    if let Some(path) = &cli.image {
        let image = load_reference_image(path).await?;
        println!("Reference image: {} ({})", image.file_name(), image.size_label());
        session.attach_image(image)?;
    }
    session.set_prompt(prompt).context("Prompt rejected")?;

    let mut ok = session.generate().await?;
    if ok && cli.proceed {
        ok = session.proceed().await?;
    }

    drop(session);
    printer.await?;
    Ok(ok)
}

fn print_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::StageChanged { to, .. } => print_stage(*to),
        WorkflowEvent::VideoReady {
            video_url,
            job_id,
            message,
        } => {
            if !message.is_empty() {
                println!("{message}");
            }
            println!("Video: {video_url}");
            if let Some(job_id) = job_id {
                println!("Job: {job_id}");
            }
        }
        WorkflowEvent::RenderingStarted { rendering_id, message } => {
            if !message.is_empty() {
                println!("{message}");
            }
            if let Some(id) = rendering_id {
                println!("Rendering id: {id}");
            }
        }
        WorkflowEvent::Failed { stage, error } => {
            eprintln!("{} failed: {error}", stage.title());
        }
    }
}

fn print_stage(stage: WorkflowStage) {
    println!(
        "[{}/{}] {} - {}",
        stage.number(),
        WorkflowStage::ALL.len(),
        stage.title(),
        stage.description()
    );
}
