use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Placeholder origin used when a table is read from or written to a bare stream.
pub const STREAM_ORIGIN: &str = "<stream>";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Malformed record in '{path}' at line {line}: {message}")]
    Malformed {
        path: String,
        line: u64,
        message: String,
    },
}

impl CsvError {
    pub(crate) fn csv(source: csv::Error) -> Self {
        Self::Csv {
            path: STREAM_ORIGIN.to_string(),
            source,
        }
    }

    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io {
            path: STREAM_ORIGIN.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(line: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: STREAM_ORIGIN.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Attributes the error to the file at `path`.
    pub fn at(self, path: &Path) -> Self {
        let path = path.to_string_lossy().to_string();
        match self {
            Self::Io { source, .. } => Self::Io { path, source },
            Self::Csv { source, .. } => Self::Csv { path, source },
            Self::Malformed { line, message, .. } => Self::Malformed {
                path,
                line,
                message,
            },
        }
    }
}

/// Defines the interface for reading and writing the CSV tables exchanged with the engine.
///
/// Implementors handle the column layout; the path-based helpers take care of buffering
/// and of attributing errors to the file involved.
pub trait CsvFile {
    /// The in-memory form produced when reading.
    type Output;

    /// The in-memory form consumed when writing.
    type Input: ?Sized;

    /// Reads a table from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read or a record is malformed.
    fn read_from(reader: impl Read) -> Result<Self::Output, CsvError>;

    /// Writes a table, header first, to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    fn write_to(table: &Self::Input, writer: impl Write) -> Result<(), CsvError>;

    /// Reads a table from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Output, CsvError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CsvError::io(e).at(path))?;
        Self::read_from(BufReader::new(file)).map_err(|e| e.at(path))
    }

    /// Writes a table to a file path, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(table: &Self::Input, path: P) -> Result<(), CsvError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CsvError::io(e).at(path))?;
        Self::write_to(table, BufWriter::new(file)).map_err(|e| e.at(path))
    }
}
