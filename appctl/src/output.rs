//! Output helpers for consistent CLI output.
//!
//! Status lines with colored prefixes, spinners for remote calls and
//! rendering of the structured result messages produced by workflows.
//!
//! ```rust,ignore
//! use appctl::output::Output;
//!
//! Output::success("New version released to users.");
//! let spinner = Output::spinner("Uploading bundle...");
//! spinner.finish_clear();
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::borrow::Cow;
use std::time::Duration;

/// Standard output helper for consistent CLI formatting.
pub struct Output;

impl Output {
    /// Print a success message with a green checkmark.
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Print a warning message with a yellow warning symbol.
    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    /// Print an info/status message with a cyan arrow.
    pub fn info(msg: impl AsRef<str>) {
        println!("{} {}", "→".cyan(), msg.as_ref().dimmed());
    }

    /// Print a key-value pair with alignment.
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<14} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }

    /// Print a dry-run message.
    pub fn dry_run(msg: impl AsRef<str>) {
        println!("{} {}", "[dry-run]".dimmed(), msg.as_ref().dimmed());
    }

    /// Create a spinner that animates until a `finish_*` call.
    pub fn spinner(msg: impl Into<Cow<'static, str>>) -> Spinner {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("valid template"),
        );
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        Spinner(pb)
    }

    /// Print a workflow result: headline, body and next steps.
    pub fn message(msg: &ResultMessage) {
        match msg.kind {
            MessageKind::Success => Self::success(&msg.headline),
            MessageKind::Info => println!("{} {}", "ℹ".cyan().bold(), msg.headline.bold()),
        }
        let body: String = msg.body.iter().map(BodyPart::render).collect();
        for line in body.lines() {
            println!("  {line}");
        }
        if !msg.next_steps.is_empty() {
            println!("\n  {}", "Next steps".bold());
            for step in &msg.next_steps {
                println!("  {} {}", "•".cyan(), step);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Info,
}

/// A piece of a result message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    Text(String),
    Link { label: String, url: String },
}

impl BodyPart {
    fn render(&self) -> String {
        match self {
            BodyPart::Text(text) => text.clone(),
            BodyPart::Link { label, url } => format!("{} ({})", label.bold(), url.underline()),
        }
    }
}

/// Structured outcome of a workflow, rendered by [`Output::message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    pub kind: MessageKind,
    pub headline: String,
    pub body: Vec<BodyPart>,
    pub next_steps: Vec<String>,
}

/// A spinner for long-running operations.
///
/// Created via `Output::spinner()`.
pub struct Spinner(ProgressBar);

impl Spinner {
    /// Finish and clear the line (no final message).
    pub fn finish_clear(self) {
        self.0.finish_and_clear();
    }
}
