//! Run one voice turn against a form JSON file
//!
//! Usage:
//!   voice-fill --form invoice.json --transcript "set client name to John Doe"
//!   voice-fill --form invoice.json --audio note.webm
//!   voice-fill --form invoice.json --focus clientDetails.email --transcript "john at example dot com"
//!   voice-fill --form invoice.json --transcript "add an item" --dry-run

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voice_fill::{
    AudioBuffer, FieldSchemaRegistry, FocusedField, FormStore, FormTree, TurnOutcome,
    VoiceCommandEngine, VoiceConfig,
};

#[derive(Parser)]
#[command(name = "voice-fill")]
#[command(about = "Fill a business-document form from a spoken or typed instruction")]
struct Args {
    /// Form JSON file; an empty form is used when omitted
    #[arg(short = 'f', long)]
    form: Option<PathBuf>,

    /// Field schema JSON; the built-in business document schema by default
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Instruction text
    #[arg(short = 't', long, conflicts_with = "audio", required_unless_present = "audio")]
    transcript: Option<String>,

    /// Audio file to transcribe
    #[arg(short = 'a', long)]
    audio: Option<PathBuf>,

    /// MIME type of the audio file; guessed from the extension when omitted
    #[arg(long, requires = "audio")]
    mime: Option<String>,

    /// Focused field path, e.g. clientDetails.email (field-scoped turn)
    #[arg(long)]
    focus: Option<String>,

    /// Label shown for the focused field
    #[arg(long, requires = "focus")]
    focus_label: Option<String>,

    /// Input kind of the focused field
    #[arg(long, default_value = "text", requires = "focus")]
    focus_kind: String,

    /// Show what would change without applying it
    #[arg(long)]
    dry_run: bool,

    /// Write the updated form back to --form
    #[arg(short = 'w', long, requires = "form", conflicts_with = "dry_run")]
    write: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_fill=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = VoiceConfig::from_env().context("Loading voice configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let registry = match &args.schema {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Reading schema {}", path.display()))?;
            FieldSchemaRegistry::from_json(&source)?
        }
        None => FieldSchemaRegistry::business_document(),
    };

    let mut form = match &args.form {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Reading form {}", path.display()))?;
            FormTree::from_value(
                serde_json::from_str(&source)
                    .with_context(|| format!("Parsing form {}", path.display()))?,
            )
        }
        None => FormTree::new(),
    };

    let focused = args.focus.as_ref().map(|name| {
        let label = args.focus_label.clone().unwrap_or_else(|| {
            registry
                .parse_path(name)
                .ok()
                .and_then(|path| registry.label_for(&path))
                .unwrap_or_else(|| name.clone())
        });
        FocusedField::new(name.clone(), args.focus_kind.clone(), label)
    });

    let mut engine =
        VoiceCommandEngine::from_config(&config, registry).with_auto_apply(!args.dry_run);
    engine.start_recording(focused, &form)?;
    if let Some(status) = engine.status_line() {
        eprintln!("{}", status);
    }

    let outcome = match (&args.transcript, &args.audio) {
        (Some(text), _) => engine.submit_transcript(text, &mut form).await?,
        (None, Some(path)) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Reading audio {}", path.display()))?;
            let mime = args.mime.clone().unwrap_or_else(|| guess_mime(path).to_string());
            engine
                .stop_recording(AudioBuffer::new(bytes, mime), &mut form)
                .await?
        }
        (None, None) => bail!("Either --transcript or --audio is required"),
    };

    let outcome = match outcome {
        TurnOutcome::AwaitingConfirmation(pending) if !args.dry_run => {
            tracing::info!(changes = pending.changes.len(), "Confirming voice updates");
            engine.confirm(&mut form)?
        }
        other => other,
    };

    let output = serde_json::json!({
        "outcome": outcome,
        "form": form.to_value()?,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.write {
        if let Some(path) = &args.form {
            tokio::fs::write(path, serde_json::to_string_pretty(form.as_value())?)
                .await
                .with_context(|| format!("Writing form {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote updated form");
        }
    }

    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        _ => "audio/webm",
    }
}
