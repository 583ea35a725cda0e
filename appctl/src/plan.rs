//! Plan-centric command infrastructure.
//!
//! Commands are split into two phases:
//! 1. **Planning**: read local and remote state and produce an immutable plan
//! 2. **Execution**: apply the plan's operations (all side effects happen here)
//!
//! Dry runs describe the plan and skip the execute phase.
//!
//! ```rust,ignore
//! let plan = DeployCommand::new(options).plan(&ctx)?;
//! println!("{}", plan.describe());
//! if !dry_run {
//!     let outcome = plan.execute(&mut exec_ctx)?;
//! }
//! ```

use anyhow::Result;
use owo_colors::OwoColorize;
use std::fmt;

use crate::command_runner::CommandRunner;
use crate::loader::LoadedApp;
use crate::partners::PartnersApi;

// ============================================================================
// Core Traits
// ============================================================================

/// A command that can produce a plan without side effects.
pub trait Plannable {
    type Plan: Plan;

    /// Analyze the current state and produce a plan.
    ///
    /// May query the Partners API, must not modify anything.
    fn plan(&self, ctx: &PlanContext<'_>) -> Result<Self::Plan>;
}

/// An immutable description of operations to perform.
pub trait Plan: Sized {
    /// What a successful execution yields.
    type Outcome;

    fn describe(&self) -> PlanSummary;

    /// Execute the plan, performing all side effects.
    fn execute(self, ctx: &mut ExecuteContext<'_>) -> Result<Self::Outcome>;

    fn is_empty(&self) -> bool;
}

// ============================================================================
// Context Types
// ============================================================================

/// Read-only inputs of the planning phase.
pub struct PlanContext<'a> {
    app: &'a LoadedApp,
    api: &'a dyn PartnersApi,
}

impl<'a> PlanContext<'a> {
    pub fn new(app: &'a LoadedApp, api: &'a dyn PartnersApi) -> Self {
        Self { app, api }
    }

    pub fn app(&self) -> &'a LoadedApp {
        self.app
    }

    pub fn api(&self) -> &'a dyn PartnersApi {
        self.api
    }
}

/// Side-effect handles of the execution phase.
pub struct ExecuteContext<'a> {
    runner: &'a dyn CommandRunner,
    api: &'a dyn PartnersApi,
}

impl<'a> ExecuteContext<'a> {
    pub fn new(runner: &'a dyn CommandRunner, api: &'a dyn PartnersApi) -> Self {
        Self { runner, api }
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    pub fn api(&self) -> &'a dyn PartnersApi {
        self.api
    }
}

// ============================================================================
// Operation Types
// ============================================================================

/// A verb describing an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Register an extension remotely
    Create,
    /// Run an extension's build command
    Build,
    /// Send an artifact or configuration
    Upload,
    /// Replace remote state in place
    Update,
    /// Archive files into a bundle
    Bundle,
    /// Submit webhook subscriptions
    Submit,
    /// Turn on a remote feature
    Enable,
    /// Write a local file
    Write,
    /// Run a toolchain check
    Check,
    /// Skip (nothing to do)
    Skip,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "Create",
            Verb::Build => "Build",
            Verb::Upload => "Upload",
            Verb::Update => "Update",
            Verb::Bundle => "Bundle",
            Verb::Submit => "Submit",
            Verb::Enable => "Enable",
            Verb::Write => "Write",
            Verb::Check => "Check",
            Verb::Skip => "Skip",
        }
    }

    pub fn colored(&self) -> String {
        match self {
            Verb::Create | Verb::Enable => self.as_str().green().to_string(),
            Verb::Upload | Verb::Submit | Verb::Update => self.as_str().yellow().to_string(),
            Verb::Build | Verb::Bundle | Verb::Write | Verb::Check => {
                self.as_str().cyan().to_string()
            }
            Verb::Skip => self.as_str().dimmed().to_string(),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single operation in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub verb: Verb,
    /// The target of the operation (e.g., "extension:checkout").
    pub target: String,
    pub details: Option<String>,
}

impl Operation {
    pub fn new(verb: Verb, target: impl Into<String>) -> Self {
        Self {
            verb,
            target: target.into(),
            details: None,
        }
    }

    pub fn with_details(verb: Verb, target: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            verb,
            target: target.into(),
            details: Some(details.into()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb.colored(), self.target)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details.dimmed())?;
        }
        Ok(())
    }
}

// ============================================================================
// Plan Summary
// ============================================================================

/// Structured description of a plan for display.
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub summary: String,
    pub operations: Vec<Operation>,
}

impl PlanSummary {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            operations: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Count of non-skip operations.
    pub fn action_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|o| o.verb != Verb::Skip)
            .count()
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary.bold())?;

        if self.operations.is_empty() {
            writeln!(f, "  {}", "No operations".dimmed())?;
        } else {
            for op in &self.operations {
                writeln!(f, "  ▸ {}", op)?;
            }
        }

        let action_count = self.action_count();
        if action_count > 0 {
            writeln!(f, "\n{} operation(s) to perform", action_count)?;
        }

        Ok(())
    }
}

// ============================================================================
// Execution Report
// ============================================================================

/// Report of plan execution.
///
/// Operations are recorded as they complete; a failing operation aborts
/// execution with an error instead.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub operations: Vec<Operation>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, verb: Verb, target: impl Into<String>) {
        self.operations.push(Operation::new(verb, target));
    }

    pub fn success_count(&self) -> usize {
        self.operations.len()
    }

    /// Verbs and targets of the completed operations, in order.
    pub fn completed(&self) -> Vec<(Verb, &str)> {
        self.operations
            .iter()
            .map(|op| (op.verb, op.target.as_str()))
            .collect()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(f, "  {} {}", "✓".green(), op)?;
        }
        writeln!(
            f,
            "{}",
            format!("{} operation(s) completed", self.success_count()).green()
        )
    }
}
