use crate::core::models::document::StarDocument;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing metadata file formats.
///
/// Implementors handle format-specific parsing and serialization; the
/// path-based helpers wrap the stream methods with buffered file handles.
pub trait MetadataFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a metadata document from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<StarDocument, Self::Error>;

    /// Writes a metadata document to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or I/O operations encounter issues.
    fn write_to(document: &StarDocument, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a metadata document from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<StarDocument, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a metadata document to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(document: &StarDocument, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(document, &mut writer)
    }
}
