//! Report types and rendering.
//!
//! A [`ModuleReport`] is produced once per checked module and is immutable
//! after creation, except for the optional owner tag the runner stamps on.
//! Rendering covers a human-readable text form and machine-readable JSON.

use std::io::{self, Write};

use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text, one block per module.
    Text,
    /// JSON array, machine-readable.
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!(
                "Unknown report format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// The verdict for one module declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    /// Name the module class is declared under.
    pub module_name: String,
    /// Absolute path of the file declaring the module.
    pub path: String,
    /// Declared imports classified unnecessary, in declared order.
    pub unnecessary_imports: Vec<String>,
    /// Owner from the nearest OWNERS file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl ModuleReport {
    /// Creates a report with no owner tag.
    pub fn new(
        module_name: impl Into<String>,
        path: impl Into<String>,
        unnecessary_imports: Vec<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            path: path.into(),
            unnecessary_imports,
            owner: None,
        }
    }

    /// Attaches an owner tag.
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// Returns true if the check flagged anything for this module.
    pub fn has_unnecessary_imports(&self) -> bool {
        !self.unnecessary_imports.is_empty()
    }
}

/// Writes reports in the given format.
pub fn write_reports<W: Write>(
    format: ReportFormat,
    reports: &[ModuleReport],
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ReportFormat::Text => write_text(reports, writer),
        ReportFormat::Json => write_json(reports, writer),
    }
}

/// Renders reports to a string.
pub fn render_to_string(format: ReportFormat, reports: &[ModuleReport]) -> io::Result<String> {
    let mut buffer = Vec::new();
    write_reports(format, reports, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_text<W: Write>(reports: &[ModuleReport], writer: &mut W) -> io::Result<()> {
    for report in reports {
        writeln!(writer, "Module: {}", report.module_name)?;
        if let Some(owner) = &report.owner {
            writeln!(writer, "Owner: {}", owner)?;
        }
        writeln!(writer, "Path: {}", report.path)?;
        writeln!(writer, "Unnecessary Imports:")?;
        for import in &report.unnecessary_imports {
            writeln!(writer, "\t{}", import)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_json<W: Write>(reports: &[ModuleReport], writer: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, reports)?;
    writeln!(writer)
}
