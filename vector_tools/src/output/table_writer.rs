//! CSV table output
//!
//! Every write opens the file, writes and closes it again, so a writer can be
//! shared between processing steps without holding a handle open.

use encoding_rs::{Encoding, UTF_8};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Writes rows to a CSV file in a fixed encoding
#[derive(Debug, Clone)]
pub struct TableWriter {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl TableWriter {
    /// Create (or truncate) the table and write the header row if there is
    /// one. `.csv` is appended to names not already ending in `csv`.
    /// `None` and `"System"` select UTF-8.
    pub fn create<S: AsRef<str>>(
        file_name: &str,
        encoding: Option<&str>,
        header: &[S],
    ) -> Result<Self> {
        let mut path = file_name.to_string();
        if !path.to_lowercase().ends_with("csv") {
            path.push_str(".csv");
        }

        let writer = Self {
            path: PathBuf::from(path),
            encoding: resolve_encoding(encoding)?,
        };

        if header.is_empty() {
            writer.write_rows::<&[S], S>(&[], true)?;
        } else {
            writer.write_rows(&[header], true)?;
        }

        tracing::debug!(
            path = %writer.path.display(),
            encoding = writer.encoding.name(),
            "Created table"
        );
        Ok(writer)
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding the table is written in
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Append one row
    pub fn add_record<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        self.write_rows(&[values], false)
    }

    /// Append several rows in one write
    pub fn add_records<R: AsRef<[S]>, S: AsRef<str>>(&self, records: &[R]) -> Result<()> {
        self.write_rows(records, false)
    }

    fn write_rows<R: AsRef<[S]>, S: AsRef<str>>(&self, rows: &[R], truncate: bool) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        for row in rows {
            csv_writer.write_record(AsRef::<[S]>::as_ref(row).iter().map(AsRef::<str>::as_ref))?;
        }

        let buffer = csv_writer
            .into_inner()
            .map_err(|e| Error::CsvError(e.to_string()))?;
        let text = String::from_utf8(buffer).map_err(|e| Error::CsvError(e.to_string()))?;

        // Unmappable characters would otherwise become HTML numeric references
        let (bytes, _, unmappable) = self.encoding.encode(&text);
        if unmappable {
            return Err(Error::CsvError(format!(
                "Row contains characters not representable in {}",
                self.encoding.name()
            )));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!truncate)
            .truncate(truncate)
            .open(&self.path)?;
        file.write_all(&bytes)?;

        Ok(())
    }
}

/// Encodings that encoding_rs can only decode (UTF-16, replacement) encode
/// as something else and are rejected.
fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    let encoding = match label {
        None | Some("System") => return Ok(UTF_8),
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::ConfigError(format!("Unknown encoding: {}", label)))?,
    };

    if encoding.output_encoding() != encoding {
        return Err(Error::ConfigError(format!(
            "Encoding {} is not supported for writing",
            encoding.name()
        )));
    }

    Ok(encoding)
}
