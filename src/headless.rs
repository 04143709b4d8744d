//! Headless review: stream one review straight to an output stream.

use crate::backend::Backend;
use crate::context::ReviewContext;
use crate::instruction_presets::InstructionPreset;
use crate::runner::{INITIAL_REVIEW_PROMPT, TurnRequest};
use crate::store::SessionId;
use crate::stream::{StreamCoordinator, StreamEvent};
use crate::tokens::TokenCounter;
use crate::{log_debug, ui};

use anyhow::{Result, bail};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the initial review without the studio, writing chunks to `out` as
/// they arrive.
///
/// The reconciled text is written again only when it differs from what was
/// streamed. Cancelling `cancel` stops the review and returns `Ok`.
pub async fn run_simple<W: Write + Send>(
    cancel: &CancellationToken,
    mut context: ReviewContext,
    backend: &Backend,
    preset: &InstructionPreset,
    out: &mut W,
) -> Result<()> {
    context.assemble_prompt(preset, &TokenCounter::new());
    log_debug!(
        "Headless review with preset '{}', ~{} prompt tokens",
        preset.name,
        context.token_estimate()
    );

    let streams = StreamCoordinator::new(
        Arc::clone(&backend.store),
        Arc::clone(&backend.runner),
        cancel.clone(),
        backend.config.streaming.clone(),
    );
    let request = TurnRequest::new(SessionId::new(), context.prompt(), INITIAL_REVIEW_PROMPT);
    let mut handle = streams.start(request);

    let spinner = (!ui::is_quiet_mode()).then(|| ui::create_spinner("Reviewing changes..."));
    let stop_spinner = |spinner: &Option<indicatif::ProgressBar>| {
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    };

    let mut printed = String::new();
    while let Some(event) = handle.next().await {
        match event {
            StreamEvent::Chunk(text) => {
                stop_spinner(&spinner);
                write!(out, "{text}")?;
                out.flush()?;
                printed.push_str(&text);
            }
            StreamEvent::Done(text) => {
                stop_spinner(&spinner);
                if text != printed {
                    if !printed.is_empty() {
                        writeln!(out, "\n")?;
                    }
                    write!(out, "{text}")?;
                }
                writeln!(out)?;
                out.flush()?;
                return Ok(());
            }
            StreamEvent::Error(error) => {
                stop_spinner(&spinner);
                if !printed.is_empty() {
                    writeln!(out)?;
                }
                return Err(error.into());
            }
        }
    }

    // A cancelled turn ends the handle without an error or a result
    stop_spinner(&spinner);
    if !printed.is_empty() {
        writeln!(out)?;
    }
    if cancel.is_cancelled() {
        ui::print_warning("Review cancelled");
        return Ok(());
    }
    bail!("Review stream ended without a result")
}
