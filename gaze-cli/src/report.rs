//! Report generation
//!
//! Summarizes a processed dataset as pretty-printed JSON or as a plain text
//! table per recording.

use crate::dataset::Dataset;
use gaze_pipeline::{EventFrame, EyeChannels, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Errors raised while rendering or writing a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unsupported output extension {extension:?}, valid extensions are: {valid:?}")]
    UnsupportedExtension {
        extension: String,
        valid: &'static [&'static str],
    },

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Txt,
}

impl OutputFormat {
    pub const VALID: &'static [&'static str] = &["json", "txt"];

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match extension.as_str() {
            "json" => Ok(OutputFormat::Json),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(ReportError::UnsupportedExtension {
                extension,
                valid: Self::VALID,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingReport {
    pub path: String,
    pub identifiers: BTreeMap<String, Value>,
    pub samples: usize,
    pub eye: EyeChannels,
    pub events: EventFrame,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub tool_version: String,
    pub library_version: String,
    pub total_events: usize,
    pub recordings: Vec<RecordingReport>,
}

impl Report {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let recordings: Vec<RecordingReport> = dataset
            .recordings()
            .iter()
            .map(|recording| RecordingReport {
                path: recording.path.display().to_string(),
                identifiers: recording.gaze.identifiers().clone(),
                samples: recording.gaze.len(),
                eye: recording.gaze.eye(),
                events: recording.events.clone(),
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            library_version: gaze_pipeline::VERSION.to_string(),
            total_events: recordings.iter().map(|r| r.events.len()).sum(),
            recordings,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, ReportError> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Txt => Ok(self.render_txt()),
        }
    }

    /// Write the report to a file, or to stdout without a path
    pub fn write(&self, path: Option<&Path>, format: OutputFormat) -> Result<(), ReportError> {
        let content = self.render(format)?;
        match path {
            Some(path) => fs::write(path, content)?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn render_txt(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(72);

        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "  Gaze Event Report");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Generated:  {}", self.generated_at);
        let _ = writeln!(out, "Version:    {} (library {})", self.tool_version, self.library_version);
        let _ = writeln!(out, "Recordings: {}", self.recordings.len());
        let _ = writeln!(out, "Events:     {}", self.total_events);

        for recording in &self.recordings {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "-".repeat(72));
            let _ = writeln!(out, "{}", recording.path);
            for (name, value) in &recording.identifiers {
                let _ = writeln!(out, "  {}: {}", name, value);
            }
            let _ = writeln!(out, "  samples: {}, eye: {:?}", recording.samples, recording.eye);
            let _ = writeln!(out);

            if recording.events.is_empty() {
                let _ = writeln!(out, "  (no events)");
                continue;
            }
            out.push_str(&event_table(&recording.events));
        }
        out
    }
}

/// Fixed-width table of all event columns
fn event_table(events: &EventFrame) -> String {
    let mut header = vec!["name".to_string(), "onset".to_string(), "offset".to_string()];
    header.extend(events.schema().iter().cloned());

    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|event| {
            let mut row = vec![event.name().to_string(), event.onset().to_string(), event.offset().to_string()];
            row.extend(
                events
                    .schema()
                    .iter()
                    .map(|column| event.get(column).map_or_else(String::new, Value::to_string)),
            );
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(header[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = width))
            .collect();
        let _ = writeln!(out, "  {}", cells.join("  "));
    }
    out
}
