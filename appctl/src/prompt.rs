//! Interactive confirmation.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionColor {
    Red,
}

/// One titled list in the table shown above a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoTableSection {
    pub header: String,
    pub items: Vec<String>,
    pub helper_text: Option<String>,
    pub color: Option<SectionColor>,
}

impl InfoTableSection {
    pub fn new(header: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            header: header.into(),
            items,
            helper_text: None,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub message: String,
    pub info_table: Vec<InfoTableSection>,
    pub confirmation_message: String,
    pub cancellation_message: String,
}

pub trait Prompter {
    /// Ask the user to confirm, returning their answer.
    fn confirm(&self, prompt: &ConfirmationPrompt) -> Result<bool>;
}

/// Terminal prompter backed by cliclack.
pub struct CliclackPrompter;

impl CliclackPrompter {
    fn print_table(prompt: &ConfirmationPrompt) {
        for section in &prompt.info_table {
            let header = section.header.replace('\n', " ");
            match section.color {
                Some(SectionColor::Red) => println!("{}", header.red().bold()),
                None => println!("{}", header.bold()),
            }
            if let Some(helper) = &section.helper_text {
                println!("  {}", helper.dimmed());
            }
            for item in &section.items {
                println!("  • {item}");
            }
            println!();
        }
    }
}

impl Prompter for CliclackPrompter {
    fn confirm(&self, prompt: &ConfirmationPrompt) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("Confirmation required but stdin is not a terminal; pass --force to skip it");
        }
        Self::print_table(prompt);
        let question = format!(
            "{}\n  yes: {}\n  no: {}",
            prompt.message, prompt.confirmation_message, prompt.cancellation_message
        );
        cliclack::confirm(question)
            .initial_value(false)
            .interact()
            .context("Failed to read confirmation")
    }
}
