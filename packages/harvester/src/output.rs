//! Writers for harvested records and explain documents.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Explain, Record};

/// Serialization used for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document per line.
    #[default]
    Json,
    /// A YAML sequence.
    Yaml,
    /// The XML as received from the server.
    Xml,
}

/// Open the output file, or standard output when no path is given.
///
/// The file is created (or truncated) right away so that an unwritable
/// path fails before anything is requested from the server.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Streams records to a writer as they are harvested.
pub struct RecordWriter<W: Write> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, record)?;
                writeln!(self.out)?;
            }
            OutputFormat::Yaml => {
                writeln!(self.out, "{}", to_yaml(&[record])?)?;
            }
            OutputFormat::Xml => {
                writeln!(self.out, "{}", record.raw())?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Write an explain document in the given format.
pub fn write_explain<W: Write>(out: &mut W, explain: &Explain, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, explain)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => writeln!(out, "{}", to_yaml(explain)?)?,
        OutputFormat::Xml => writeln!(out, "{}", explain.raw().trim_end())?,
    }
    out.flush()?;
    Ok(())
}

/// Serialize to YAML with sequence items indented under their key.
fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(value)?;
    Ok(indent_yaml_sequences(yaml.trim_end()))
}

/// Indent block sequences one level deeper than their parent key.
///
/// `serde_yaml_ng` writes sequence items at the indentation of the key
/// that holds them; this shifts them (and everything nested under them)
/// two spaces to the right per enclosing sequence.
fn indent_yaml_sequences(yaml: &str) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut seq_indents: Vec<usize> = Vec::new();

    for line in yaml.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            result.push(line.to_string());
            continue;
        }

        let indent = line.len() - trimmed.len();
        while let Some(&seq_indent) = seq_indents.last() {
            if indent < seq_indent || (indent == seq_indent && !trimmed.starts_with("- ")) {
                seq_indents.pop();
            } else {
                break;
            }
        }

        // Top-level sequences stay flush left.
        if trimmed.starts_with("- ") && indent > 0 {
            let continues = seq_indents.last().is_some_and(|&si| si == indent);
            if !continues {
                seq_indents.push(indent);
            }
        }

        let extra = seq_indents.len() * 2;
        result.push(format!("{}{trimmed}", " ".repeat(indent + extra)));
    }

    result.join("\n")
}
