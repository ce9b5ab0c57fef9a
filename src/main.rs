//! Calibration sandbox
//!
//! Runs the calibration dialogue against a generation backend from the
//! terminal, then exports the resulting microtask breakdown as a JSON bundle
//! and a paginated text report.

mod backend;
mod config;
mod dialogue;
mod options;
mod report;
mod stream;

use backend::{GenerationRequest, HttpBackend, LoggingBackend, QuestionBackend};
use config::SandboxConfig;
use dialogue::{
    ConversationState, DialogueEngine, DialogueHandle, EngineClosed, Outcome, Phase, SessionEvent,
};
use report::{
    paginate, ArtifactSink, AttachmentMeta, ExportBundle, FileArtifactSink, ReportMetadata,
};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use stream::Metrics;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REPORT_TITLE: &str = "Microtask plan";

type Input = Lines<BufReader<Stdin>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the dialogue
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calibration_sandbox=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Arc::new(SandboxConfig::from_env()?);
    tracing::info!(
        api_base = %config.api_base,
        export_dir = %config.export_dir.display(),
        course_id = %config.course_id,
        assignment_id = %config.assignment_id,
        "Configuration loaded"
    );

    let backend = Arc::new(LoggingBackend::new(HttpBackend::new(Arc::clone(&config))?));
    let handle = DialogueEngine::spawn(Arc::clone(&backend), config.delta_pause);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let Some(metrics) = run_dialogue(&handle, &mut input).await? else {
        tracing::info!("Input closed before calibration finished");
        return Ok(());
    };
    drop(handle);

    export(&config, &*backend, metrics).await
}

/// Drive the dialogue until metrics arrive. `None` means stdin closed first.
async fn run_dialogue(
    handle: &DialogueHandle,
    input: &mut Input,
) -> Result<Option<Metrics>, Box<dyn std::error::Error>> {
    let mut events = handle.subscribe();
    handle.start().await?;
    let mut printed = 0usize;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed dialogue notifications");
                continue;
            }
            Err(RecvError::Closed) => return Err(EngineClosed.into()),
        };

        match event {
            SessionEvent::TurnStarted { turn_index } => {
                tracing::debug!(turn_index, "Turn started");
                printed = 0;
            }
            SessionEvent::TextUpdated { text } => {
                if let Some(delta) = text.get(printed..) {
                    print!("{delta}");
                    std::io::stdout().flush()?;
                }
                printed = text.len();
            }
            SessionEvent::OptionsReady { options, .. } => {
                println!();
                for option in &options {
                    println!("  {}) {}", option.key, option.label);
                }
                if !answer_turn(handle, input).await? {
                    return Ok(None);
                }
            }
            SessionEvent::TurnComplete { .. } => {
                println!();
                if !answer_turn(handle, input).await? {
                    return Ok(None);
                }
            }
            SessionEvent::Synthesizing { metrics } => {
                println!("\nCalibration complete: {metrics}");
                println!("Generating your microtask plan...");
                return Ok(Some(metrics));
            }
            SessionEvent::Failure { message } => {
                println!("\n{message}");
                let answered = if handle.snapshot().state.phase == Phase::NotStarted {
                    retry_start(handle, input).await?
                } else {
                    answer_turn(handle, input).await?
                };
                if !answered {
                    return Ok(None);
                }
                printed = 0;
            }
        }
    }
}

/// Read answers until one is accepted. `false` means stdin closed.
async fn answer_turn(handle: &DialogueHandle, input: &mut Input) -> std::io::Result<bool> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            return Ok(false);
        };

        let answer = resolve_answer(&handle.snapshot().state, &line);
        match handle.submit(answer).await {
            Ok(Outcome::Ignored(reason)) => println!("({reason})"),
            Ok(outcome) => return Ok(outcome.is_accepted()),
            Err(EngineClosed) => return Ok(false),
        }
    }
}

async fn retry_start(handle: &DialogueHandle, input: &mut Input) -> std::io::Result<bool> {
    println!("Press Enter to try again.");
    if input.next_line().await?.is_none() {
        return Ok(false);
    }
    Ok(handle.start().await.is_ok_and(|outcome| outcome.is_accepted()))
}

/// A lone option letter stands for its label; anything else is sent as typed
fn resolve_answer(state: &ConversationState, line: &str) -> String {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    if let (Some(key), None) = (chars.next(), chars.next()) {
        if let Some(label) = state.option_label(key) {
            return label.to_string();
        }
    }
    trimmed.to_string()
}

/// Paths and counts of a finished export
#[derive(Debug)]
struct ExportSummary {
    bundle_path: PathBuf,
    report_path: PathBuf,
    tasks: usize,
    pages: usize,
}

/// Generate the microtask plan and write the bundle and report to `sink`
async fn export_plan(
    config: &SandboxConfig,
    backend: &dyn QuestionBackend,
    sink: &dyn ArtifactSink,
    metrics: Metrics,
    exported_at: DateTime<Utc>,
) -> Result<ExportSummary, Box<dyn std::error::Error>> {
    let attachment = match &config.attachment_path {
        Some(path) => match AttachmentMeta::from_path(path).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read attachment");
                None
            }
        },
        None => None,
    };

    let request = GenerationRequest {
        course_id: config.course_id.clone(),
        assignment_id: config.assignment_id.clone(),
        metrics,
        attachment: attachment.clone(),
    };
    let response = backend.generate_microtasks(&request).await?;

    let metadata = ReportMetadata {
        title: REPORT_TITLE.to_string(),
        exported_at,
        course_id: config.course_id.clone(),
        assignment_id: config.assignment_id.clone(),
        dials: metrics,
        attachment,
        pedagogical_reasoning: response.pedagogical_reasoning.clone(),
    };
    let document = paginate(&metadata, &response.microtasks);
    let bundle = ExportBundle::build(&metadata, &response);

    let stem = bundle.file_stem();
    let bundle_path = sink.write_bundle(&stem, &bundle).await?;
    let report_path = sink.write_report(&stem, &document).await?;

    Ok(ExportSummary {
        bundle_path,
        report_path,
        tasks: response.microtasks.len(),
        pages: document.page_count(),
    })
}

async fn export(
    config: &SandboxConfig,
    backend: &dyn QuestionBackend,
    metrics: Metrics,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = FileArtifactSink::new(&config.export_dir);
    tracing::debug!(dir = %sink.dir().display(), "Exporting");
    let summary = export_plan(config, backend, &sink, metrics, Utc::now()).await?;

    println!("{} tasks across {} pages", summary.tasks, summary.pages);
    println!("Bundle: {}", summary.bundle_path.display());
    println!("Report: {}", summary.report_path.display());
    Ok(())
}
