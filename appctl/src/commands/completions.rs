//! Shell completion generation.

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Generator;
use clap_complete_nushell::Nushell;
use std::io::{self, Write};

use crate::cli::Cli;

/// Supported shell types for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Nushell,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn write_completions<G: Generator>(generator: G, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(generator, &mut cmd, name, out);
}

/// Write the completion script for `shell` to `out`.
pub fn generate(shell: Shell, out: &mut dyn Write) {
    match shell {
        Shell::Bash => write_completions(clap_complete::Shell::Bash, out),
        Shell::Zsh => write_completions(clap_complete::Shell::Zsh, out),
        Shell::Fish => write_completions(clap_complete::Shell::Fish, out),
        Shell::PowerShell => write_completions(clap_complete::Shell::PowerShell, out),
        Shell::Nushell => write_completions(Nushell, out),
    }
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    generate(args.shell, &mut io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_mention_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Nushell] {
            let mut out = Vec::new();
            generate(shell, &mut out);
            let script = String::from_utf8(out).unwrap();
            assert!(script.contains("deploy"), "{shell:?} completions lack deploy");
        }
    }
}
