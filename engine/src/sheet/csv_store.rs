//! Delimited-text sheet store with encoding auto-detection.
//!
//! Sheets edited in office suites are often saved in a legacy code page, so
//! reads detect the encoding first. Writes are always UTF-8.

use std::fs;
use std::path::Path;

use super::{Sheet, SheetStore};
use crate::error::{SheetError, SheetResult};

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }
    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "gb2312" | "gbk" | "gb18030" => "gb18030".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.to_string(),
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    }
}

/// Sheet store reading and writing delimited text files.
#[derive(Debug, Clone)]
pub struct CsvStore {
    delimiter: u8,
}

impl CsvStore {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Parse decoded sheet text.
    pub fn parse(&self, content: &str, path: &Path) -> SheetResult<Sheet> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SheetError::Format {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            rows.push(record.iter().map(String::from).collect::<Vec<_>>());
        }
        Ok(Sheet::from_rows(rows))
    }

    /// Render a sheet as delimited text, every row padded to the sheet width.
    pub fn render(&self, sheet: &Sheet, path: &Path) -> SheetResult<Vec<u8>> {
        let format_err = |message: String| SheetError::Format {
            path: path.to_path_buf(),
            message,
        };
        let width = sheet.width();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());
        for row in 0..sheet.row_count() {
            let cells: Vec<String> = (0..width).map(|col| sheet.cell_text(row, col)).collect();
            writer
                .write_record(&cells)
                .map_err(|e| format_err(e.to_string()))?;
        }
        writer.into_inner().map_err(|e| format_err(e.to_string()))
    }
}

impl Default for CsvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetStore for CsvStore {
    fn extension(&self) -> &str {
        "csv"
    }

    fn open(&self, path: &Path) -> SheetResult<Option<Sheet>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SheetError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let encoding = detect_encoding(&bytes);
        let content = decode_content(&bytes, &encoding);
        self.parse(&content, path).map(Some)
    }

    fn save(&self, path: &Path, sheet: &Sheet) -> SheetResult<()> {
        let data = self.render(sheet, path)?;
        fs::write(path, data).map_err(|source| SheetError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
