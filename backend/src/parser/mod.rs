//! CSV ingestion for instrument exports, with encoding auto-detection.
//!
//! Splits raw text into a [`TabularRecord`]: the first line becomes the
//! headers and every following line a row of typed cells. Fields are split
//! verbatim on commas; quoted fields are not supported.

use crate::error::{CsvError, CsvResult};
use crate::models::{Cell, Row, TabularRecord};

/// Field separator of instrument exports.
pub const DELIMITER: char = ',';

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed headers and rows
    pub record: TabularRecord,
    /// Detected encoding
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                CsvError::EncodingError(format!("unsupported encoding '{}'", other))
            })?;
            codec.decode(bytes).0.into_owned()
        }
    };

    // Exports from some instruments carry a UTF-8 byte order mark.
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Parse CSV text into a record.
///
/// # Example
/// ```ignore
/// use assaynorm::parse;
///
/// let record = parse("Protein,S1\nBSA,10\nActin,").unwrap();
/// assert_eq!(record.headers, vec!["Protein", "S1"]);
/// assert_eq!(record.rows.len(), 2);
/// ```
pub fn parse(raw: &str) -> CsvResult<TabularRecord> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(CsvError::MalformedInput("CSV input is empty".to_string()));
    }

    let mut lines = content.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    let headers: Vec<String> = lines
        .next()
        .map(|line| line.split(DELIMITER).map(str::to_string).collect())
        .unwrap_or_default();

    let rows: Vec<Row> = lines.map(parse_line).collect();

    Ok(TabularRecord::new(headers, rows))
}

/// Split one line into typed cells.
fn parse_line(line: &str) -> Row {
    line.split(DELIMITER).map(Cell::from_field).collect()
}

/// Parse CSV bytes with auto-detection of encoding.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let record = parse(&content)?;

    Ok(ParseResult { record, encoding })
}

/// Parse a CSV file with auto-detection of encoding.
pub fn parse_file<P: AsRef<std::path::Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let record = parse("Protein,S1,S2\nBSA,10,20\nActin,5,10").unwrap();

        assert_eq!(record.headers, vec!["Protein", "S1", "S2"]);
        assert_eq!(record.rows.len(), 2);
        assert_eq!(record.rows[0][0], Cell::Text("BSA".into()));
        assert_eq!(record.rows[0][1], Cell::Number(10.0));
        assert_eq!(record.rows[1][2], Cell::Number(10.0));
    }

    #[test]
    fn test_missing_values_are_empty() {
        let record = parse("a,b,c\n1,,3").unwrap();

        assert_eq!(record.rows[0][0], Cell::Number(1.0));
        assert_eq!(record.rows[0][1], Cell::Empty);
        assert_eq!(record.rows[0][2], Cell::Number(3.0));
    }

    #[test]
    fn test_quotes_are_not_interpreted() {
        let record = parse("a,b\n\"x,y\",1").unwrap();

        assert_eq!(record.rows[0].len(), 3);
        assert_eq!(record.rows[0][0], Cell::Text("\"x".into()));
    }

    #[test]
    fn test_crlf_line_endings() {
        let record = parse("a,b\r\n1,2\r\n3,4\r\n").unwrap();

        assert_eq!(record.headers, vec!["a", "b"]);
        assert_eq!(record.rows.len(), 2);
        assert_eq!(record.rows[1][1], Cell::Number(4.0));
    }

    #[test]
    fn test_inner_blank_lines_are_kept() {
        let record = parse("a,b\n1,2\n\n3,4").unwrap();

        assert_eq!(record.rows.len(), 3);
        assert_eq!(record.rows[1], vec![Cell::Empty]);
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse("  \n \n");
        assert!(matches!(result, Err(CsvError::MalformedInput(_))));
    }

    #[test]
    fn test_header_only() {
        let record = parse("a,b,c").unwrap();
        assert_eq!(record.headers.len(), 3);
        assert!(record.rows.is_empty());
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes(b"Protein,S1\nBSA,10").unwrap();

        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.record.rows.len(), 1);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plate.csv");
        std::fs::write(&path, "Protein,S1\r\nBSA,10\r\nActin,5\r\n").unwrap();

        let result = parse_file(&path).unwrap();
        assert_eq!(result.record.headers, vec!["Protein", "S1"]);
        assert_eq!(result.record.rows[1][1], Cell::Number(5.0));

        let missing = parse_file(dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(CsvError::IoError(_))));
    }

    #[test]
    fn test_bom_is_stripped() {
        let decoded = decode_content("\u{feff}Protein,S1\nBSA,10".as_bytes(), "utf-8").unwrap();
        let record = parse(&decoded).unwrap();
        assert_eq!(record.headers[0], "Protein");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Protéine" in ISO-8859-1
        let bytes: &[u8] = &[0x50, 0x72, 0x6F, 0x74, 0xE9, 0x69, 0x6E, 0x65];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Protéine");
    }
}
