//! `flexi` - ask the agent something from the command line.

use agent_sdk::{
    builtin_tools, CancelFlag, CodebaseCorpus, CycleRecord, OrchestratorBuilder, PromptBuilder,
    RunOutcome, RunReport, SessionStore, ToolRegistry,
};
use anyhow::{bail, Context};
use clap::Parser;
use flexi_kernel::build_registry;
use flexi_kernel::infrastructure::{config::Settings, telemetry::TelemetryBuilder};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Exit status after Ctrl-C, as shells report it.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "flexi",
    version,
    about = "Answer a request by letting a model run Python and tools"
)]
struct Cli {
    /// The request; read from stdin when omitted.
    #[arg()]
    request: Vec<String>,
    /// Settings file used instead of ./flexi.toml.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Model identifier, overriding the settings.
    #[arg(long)]
    model: Option<String>,
    /// Correction rounds before giving up, overriding the settings.
    #[arg(long)]
    max_retries: Option<u32>,
    /// Wait for whole responses instead of printing them as they stream.
    #[arg(long)]
    no_stream: bool,
    /// Directory whose source files are attached to the request.
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// File extensions included from the corpus directory.
    #[arg(long, value_delimiter = ',', default_value = "py,rs,js,ts,md,toml")]
    corpus_ext: Vec<String>,
    /// Background appended to every system prompt.
    #[arg(long)]
    summary: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::new(),
    }
    .context("Failed to load configuration")?;
    if let Some(model) = &cli.model {
        settings.agent.model.clone_from(model);
    }
    if let Some(max_retries) = cli.max_retries {
        settings.agent.max_retries = max_retries;
    }

    TelemetryBuilder::from_settings(&settings.telemetry)
        .init()
        .context("Failed to initialize telemetry")?;

    let request = read_request(&cli.request)?;

    let tools = ToolRegistry::build(
        builtin_tools(&settings.agent.builtin_settings())?,
        settings.agent.custom_tools_dir.as_deref(),
    )?;
    info!(tools = tools.len(), model = %settings.agent.model, "Flexi starting");

    let mut prompts = PromptBuilder::new();
    if let Some(summary) = &cli.summary {
        prompts = prompts.with_summary_context(summary.clone());
    }
    if let Some(dir) = &cli.corpus {
        let extensions: Vec<&str> = cli.corpus_ext.iter().map(String::as_str).collect();
        let corpus = CodebaseCorpus::load(dir, &extensions, settings.agent.max_file_size)
            .with_context(|| format!("Failed to read corpus at {}", dir.display()))?;
        info!(files = corpus.files().len(), "Corpus loaded");
        prompts = prompts.with_corpus(corpus);
    }

    let cancel = CancelFlag::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut builder = OrchestratorBuilder::new()
        .gateway(Arc::new(build_registry(&settings.inference)?))
        .tools(Arc::new(tools))
        .prompts(prompts)
        .config(settings.agent.clone())
        .cancel(cancel.clone());
    if !cli.no_stream {
        builder = builder.sink(Arc::new(tx));
    }
    let agent = builder.build()?;

    let mut run = tokio::spawn(async move { agent.run(&request).await });

    // Chunks go to stderr as progress; stdout only carries the answer.
    let report = loop {
        tokio::select! {
            biased;
            Some(chunk) = rx.recv() => print_progress(&chunk),
            joined = &mut run => break joined.context("Agent task panicked")??,
            _ = signal::ctrl_c() => {
                if interrupt(&cancel) == Interrupt::Exit {
                    run.abort();
                    eprintln!("Interrupted");
                    return Ok(ExitCode::from(EXIT_CANCELLED));
                }
            }
        }
    };
    while let Ok(chunk) = rx.try_recv() {
        print_progress(&chunk);
    }
    if !cli.no_stream {
        eprintln!();
    }

    if settings.history.enabled {
        record(&SessionStore::new(settings.history.resolve_dir()), &report).await;
    }

    Ok(match &report.outcome {
        RunOutcome::Answered { answer, .. } => {
            println!("{answer}");
            ExitCode::SUCCESS
        }
        RunOutcome::Failed { message, .. } => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        RunOutcome::Cancelled { partial, .. } => {
            eprintln!("{partial}");
            ExitCode::from(EXIT_CANCELLED)
        }
    })
}

/// What a Ctrl-C does at this point of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// First signal: ask the loop to stop at its next checkpoint.
    Cancel,
    /// Repeated signal: stop now, killing any running child.
    Exit,
}

fn interrupt(cancel: &CancelFlag) -> Interrupt {
    if cancel.is_cancelled() {
        warn!("Second interrupt, exiting");
        Interrupt::Exit
    } else {
        warn!("Cancellation requested");
        cancel.cancel();
        Interrupt::Cancel
    }
}

fn read_request(args: &[String]) -> anyhow::Result<String> {
    let request = if args.is_empty() {
        std::io::read_to_string(std::io::stdin()).context("Failed to read request from stdin")?
    } else {
        args.join(" ")
    };
    if request.trim().is_empty() {
        bail!("No request given");
    }
    Ok(request)
}

fn print_progress(chunk: &str) {
    let mut stderr = std::io::stderr().lock();
    // Progress output is best effort
    let _ = stderr.write_all(chunk.as_bytes());
    let _ = stderr.flush();
}

async fn record(store: &SessionStore, report: &RunReport) {
    match store.write(&CycleRecord::from_report(report)).await {
        Ok(path) => info!(path = %path.display(), "Cycle recorded"),
        Err(e) => warn!(error = %e, "Failed to record cycle"),
    }
}
