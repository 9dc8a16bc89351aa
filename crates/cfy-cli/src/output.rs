//! Output formatting for command results.
//!
//! Supports table (human-readable) and JSON output formats. Event streams
//! are rendered by [`crate::events::EventFormatter`] instead.

use std::io::Write;

use cfy_rest::Execution;
use serde::Serialize;

use crate::error::CliError;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

impl Format {
    /// JSON when `json` is set, table otherwise.
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Table }
    }
}

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for Execution {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Execution: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  Workflow:       {}", self.workflow_id)?;
        writeln!(writer, "  Deployment:     {}", self.deployment_id)?;
        if !self.blueprint_id.is_empty() {
            writeln!(writer, "  Blueprint:      {}", self.blueprint_id)?;
        }
        writeln!(writer, "  Status:         {}", self.status)?;
        if !self.created_at.is_empty() {
            writeln!(writer, "  Created:        {}", self.created_at)?;
        }
        if let Some(error) = &self.error {
            writeln!(writer, "  Error:          {}", first_line(error))?;
        }

        if !self.parameters.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Parameters")?;
            for (name, value) in &self.parameters {
                writeln!(writer, "  {name}: {value}")?;
            }
        }
        Ok(())
    }
}

/// Executions for display.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ExecutionList {
    /// Executions, in manager order.
    pub executions: Vec<Execution>,
}

impl TableDisplay for ExecutionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.executions.is_empty() {
            writeln!(writer, "No executions")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<24}  {:<24}  {:<16}  {:<23}",
            "ID", "WORKFLOW", "DEPLOYMENT", "STATUS", "CREATED"
        )?;
        writeln!(writer, "{}", "─".repeat(131))?;

        for execution in &self.executions {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<24}  {:<16}  {:<23}",
                execution.id,
                truncate(&execution.workflow_id, 24),
                truncate(&execution.deployment_id, 24),
                execution.status,
                execution.created_at
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} execution(s)", self.executions.len())?;
        Ok(())
    }
}

/// Outcome of resolving a blueprint import.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedImport {
    /// URL as written in the blueprint.
    pub url: String,
    /// URL that would be fetched.
    pub resolved: String,
}

impl TableDisplay for ResolvedImport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.url == self.resolved {
            writeln!(writer, "{} (unchanged)", self.resolved)?;
        } else {
            writeln!(writer, "{} -> {}", self.url, self.resolved)?;
        }
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
