//! Builds the environment-variable set handed to external handler scripts.
//!
//! These are passed directly to [`tokio::process::Command::envs`] rather
//! than set on the running process: unlike the original (one process per
//! call via `fork`), this program runs every call as a task in one shared
//! address space, so mutating the process environment per call would race
//! across concurrent calls.

use std::collections::HashMap;

use chrono::{DateTime, Local};

/// Everything the engine knows about a finished call that a handler might
/// need, independent of which specific handler (recording vs. save) is run.
pub struct CallSummary<'a> {
    pub duration: std::time::Duration,
    pub channels: u16,
    pub call_start: DateTime<Local>,
    pub call_id: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub wavpath: &'a str,
    pub extra: &'a HashMap<String, String>,
}

fn format_duration(d: std::time::Duration) -> String {
    let total = d.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

/// Builds the base environment shared by every handler invocation for this
/// call: `duration`, `channels`, `calltime`, `maildate`, `i`, `from`, `to`,
/// `wavpath`, plus any `X-Record` `;name=value` parameter.
pub fn base_environment(summary: &CallSummary<'_>) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("duration".to_string(), format_duration(summary.duration));
    env.insert("channels".to_string(), summary.channels.to_string());
    env.insert(
        "calltime".to_string(),
        summary.call_start.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    );
    env.insert(
        "maildate".to_string(),
        summary.call_start.format("%a, %e %b %Y %H:%M:%S %z").to_string(),
    );
    env.insert("i".to_string(), summary.call_id.to_string());
    env.insert("from".to_string(), summary.from.to_string());
    env.insert("to".to_string(), summary.to.to_string());
    env.insert("wavpath".to_string(), summary.wavpath.to_string());
    for (key, value) in summary.extra {
        env.insert(key.clone(), value.clone());
    }
    env
}

/// One recipient parsed from the `X-Record` header's comma-separated list:
/// a display name (possibly absent) and the recipient URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub display_name: Option<String>,
    pub uri: String,
}

/// Adds the per-recipient `name`/`email` pair to a clone of the base
/// environment, as the recording handler expects.
pub fn recipient_environment(base: &HashMap<String, String>, recipient: &Recipient) -> HashMap<String, String> {
    let mut env = base.clone();
    env.insert(
        "name".to_string(),
        recipient.display_name.clone().unwrap_or_default(),
    );
    env.insert("email".to_string(), recipient.uri.clone());
    env
}
