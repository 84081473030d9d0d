use memmap2::Mmap;
use std::{
    fs::File,
    io::{self, Cursor, Read, Write},
    path::{Path, PathBuf},
};

use crate::processor::{ProcessorError, Row};

/// Lazily produced rows of a table; the first row is the header.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row, ProcessorError>> + 'a>;

/// Something that can be read from the beginning, as many times as needed.
///
/// Schema inference and the query pipeline each call [`TableSource::rows`]
/// independently, so every call must restart at the header row.
pub trait TableSource {
    fn rows(&self) -> Result<RowIter<'_>, ProcessorError>;
}

/// Something a finished [`Table`] can be written to.
pub trait TableSink {
    fn write_table(&mut self, table: &Table) -> Result<(), ProcessorError>;
}

/// Delimited text format shared by readers and writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
}

impl Default for TableFormat {
    fn default() -> Self {
        TableFormat { delimiter: b',' }
    }
}

impl TableFormat {
    pub fn with_delimiter(delimiter: u8) -> Self {
        TableFormat { delimiter }
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        // The header is handed out as the first row like any other record.
        builder.has_headers(false).delimiter(self.delimiter);
        builder
    }

    fn writer_builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(self.delimiter);
        builder
    }
}

/// A delimited file on disk, memory mapped on every read.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    format: TableFormat,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvTable {
            path: path.into(),
            format: TableFormat::default(),
        }
    }

    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvTable {
    /// Opens and maps the file, then streams its records.
    ///
    /// # Errors
    /// - [`ProcessorError::SourceNotFound`] if the file does not exist
    /// - [`ProcessorError::Io`] if it cannot be opened or mapped
    ///
    /// Malformed records (bad quoting, ragged rows, invalid UTF-8) surface as
    /// [`ProcessorError::SourceRead`] items of the returned iterator.
    fn rows(&self) -> Result<RowIter<'_>, ProcessorError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessorError::SourceNotFound {
                path: self.path.display().to_string(),
            },
            _ => ProcessorError::Io(e),
        })?;

        // Zero-length files cannot be mapped.
        if file.metadata()?.len() == 0 {
            return Ok(Box::new(std::iter::empty()));
        }

        // The map is read-only and owned by the reader for the whole pass.
        let mmap = unsafe { Mmap::map(&file)? };
        let reader = self.format.reader_builder().from_reader(Cursor::new(mmap));

        Ok(Box::new(reader.into_records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(ProcessorError::from)
        })))
    }
}

/// An in-memory table: a header and its data rows.
///
/// Produced by the query pipeline, and usable as a [`TableSource`] itself
/// (for piped input or tests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Table { headers, rows }
    }

    /// Reads a whole delimited table from `reader`.
    ///
    /// An empty input gives an empty table, which has no header row.
    pub fn from_reader<R: Read>(reader: R, format: &TableFormat) -> Result<Self, ProcessorError> {
        let mut records = format.reader_builder().from_reader(reader).into_records();

        let headers = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Ok(Table::default()),
        };

        let mut rows = Vec::new();
        for record in records {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Table { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl TableSource for Table {
    fn rows(&self) -> Result<RowIter<'_>, ProcessorError> {
        if self.headers.is_empty() && self.rows.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        let header = std::iter::once(Ok(self.headers.clone()));
        Ok(Box::new(header.chain(self.rows.iter().cloned().map(Ok))))
    }
}

/// Writes tables as delimited text.
pub struct CsvTableWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvTableWriter<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>, format: &TableFormat) -> Result<Self, ProcessorError> {
        let writer = format
            .writer_builder()
            .from_path(path)
            .map_err(ProcessorError::SinkWrite)?;
        Ok(CsvTableWriter { writer })
    }
}

impl<W: Write> CsvTableWriter<W> {
    pub fn from_writer(inner: W, format: &TableFormat) -> Self {
        CsvTableWriter {
            writer: format.writer_builder().from_writer(inner),
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, ProcessorError> {
        self.writer
            .into_inner()
            .map_err(|e| ProcessorError::SinkWrite(csv::Error::from(e.into_error())))
    }
}

impl<W: Write> TableSink for CsvTableWriter<W> {
    fn write_table(&mut self, table: &Table) -> Result<(), ProcessorError> {
        self.writer
            .write_record(&table.headers)
            .map_err(ProcessorError::SinkWrite)?;
        for row in &table.rows {
            self.writer
                .write_record(row)
                .map_err(ProcessorError::SinkWrite)?;
        }
        self.writer
            .flush()
            .map_err(|e| ProcessorError::SinkWrite(csv::Error::from(e)))
    }
}
