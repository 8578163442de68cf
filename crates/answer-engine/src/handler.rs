//! Invokes the external recording/save handler scripts once a call ends.
//!
//! Spawning a real child process here (rather than just logging) is
//! retained deliberately even though the call itself now runs as a task,
//! not a forked process: the handler contract is an external-process
//! boundary (`spec.md` §6), not an internal concurrency primitive.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::env::Recipient;

/// Runs the recording handler once per `X-Record` recipient with argv
/// `[handler, from-local, to-local, display-name, email-uri]`.
pub async fn run_recording_handler(
    handler: &Path,
    from_local: &str,
    to_local: &str,
    recipient: &Recipient,
    env: &HashMap<String, String>,
) {
    let display_name = recipient.display_name.as_deref().unwrap_or("");
    let status = tokio::process::Command::new(handler)
        .arg(from_local)
        .arg(to_local)
        .arg(display_name)
        .arg(&recipient.uri)
        .envs(env)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            info!(handler = %handler.display(), recipient = %recipient.uri, "recording handler completed");
        }
        Ok(status) => {
            warn!(handler = %handler.display(), ?status, "recording handler exited non-zero");
        }
        Err(error) => {
            warn!(handler = %handler.display(), %error, "failed to spawn recording handler");
        }
    }
}

/// Runs the save handler once, with argv `[handler, wav-path]`.
pub async fn run_save_handler(handler: &Path, wav_path: &Path, env: &HashMap<String, String>) {
    let status = tokio::process::Command::new(handler)
        .arg(wav_path)
        .envs(env)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            info!(handler = %handler.display(), path = %wav_path.display(), "save handler completed");
        }
        Ok(status) => {
            warn!(handler = %handler.display(), ?status, "save handler exited non-zero");
        }
        Err(error) => {
            warn!(handler = %handler.display(), %error, "failed to spawn save handler");
        }
    }
}
