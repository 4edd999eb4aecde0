//! CSV parsing with encoding auto-detection, plus a truncated preview mode.
//!
//! Rows become JSON objects keyed by the header line. Blank lines are
//! skipped; values for missing trailing fields are not tolerated (ragged
//! rows are a parse failure). Preview and full parse share one code path so
//! what the confirmation dialog shows matches what the import will do.

use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{CsvError, CsvResult};

/// Result of parsing with metadata.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Parsed records as JSON objects, one per non-empty data row.
    pub records: Vec<Value>,
    /// Column headers, in file order.
    pub headers: Vec<String>,
    /// Detected encoding.
    pub encoding: String,
}

/// Number of data rows shown in the confirmation preview.
pub const PREVIEW_ROWS: usize = 3;

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// Labels outside the common set are resolved through encoding_rs;
/// a label it does not know is an [`CsvError::Encoding`] error.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).to_string()),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => Ok(enc.decode(bytes).0.to_string()),
            None => Err(CsvError::Encoding(format!("unrecognized encoding '{other}'"))),
        },
    }
}

/// Read a CSV file from disk, for the CLI entry points.
pub fn read_file(path: &Path) -> CsvResult<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Parse CSV bytes into JSON records.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<ParseOutcome> {
    parse_inner(bytes, None)
}

/// Truncated invocation of the same parser: stops after the first
/// [`PREVIEW_ROWS`] data rows, for the confirmation dialog.
pub fn parse_preview(bytes: &[u8]) -> CsvResult<ParseOutcome> {
    parse_inner(bytes, Some(PREVIEW_ROWS))
}

fn parse_inner(bytes: &[u8], limit: Option<usize>) -> CsvResult<ParseOutcome> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::Malformed(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        // First parser-reported problem (bad quoting, ragged row) is fatal;
        // nothing is silently dropped.
        let record = result.map_err(|e| CsvError::Malformed(e.to_string()))?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let raw = record.get(i).unwrap_or("");
            obj.insert(header.clone(), json!(raw));
        }
        records.push(Value::Object(obj));

        if let Some(limit) = limit {
            if records.len() >= limit {
                break;
            }
        }
    }

    Ok(ParseOutcome { records, headers, encoding })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "first_name,last_name\nAlice,Nguyen\nBob,Okafor";
        let out = parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(out.headers, vec!["first_name", "last_name"]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0]["first_name"], "Alice");
        assert_eq!(out.records[1]["last_name"], "Okafor");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "a,b\n1,2\n\n3,4\n\n";
        let out = parse_bytes(csv.as_bytes()).unwrap();
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,notes\n\"Nguyen, Alice\",\"Likes robotics\"";
        let out = parse_bytes(csv.as_bytes()).unwrap();
        assert_eq!(out.records[0]["name"], "Nguyen, Alice");
        assert_eq!(out.records[0]["notes"], "Likes robotics");
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let csv = "a,b\n1,2\n3,4,5";
        let err = parse_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CsvError::Malformed(_)));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_bytes(b"").unwrap_err(), CsvError::EmptyFile));
        assert!(matches!(parse_bytes(b"  \n \n").unwrap_err(), CsvError::EmptyFile));
    }

    #[test]
    fn test_preview_stops_after_three_rows() {
        let csv = "a,b\n1,2\n3,4\n5,6\n7,8";
        let preview = parse_preview(csv.as_bytes()).unwrap();
        let full = parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(preview.records.len(), 3);
        assert_eq!(full.records.len(), 4);
        // Identical parsing rules: the preview is a prefix of the full parse.
        assert_eq!(preview.records[..], full.records[..3]);
    }

    #[test]
    fn test_values_trimmed() {
        let csv = "a,b\n  1 , x \n";
        let out = parse_bytes(csv.as_bytes()).unwrap();
        assert_eq!(out.records[0]["a"], "1");
        assert_eq!(out.records[0]["b"], "x");
    }

    #[test]
    fn test_unrecognized_encoding_label_is_an_error() {
        let err = decode_content(b"a,b", "klingon").unwrap_err();
        assert!(matches!(err, CsvError::Encoding(_)));
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn test_read_file_missing_path_is_io_error() {
        let err = read_file(Path::new("/nonexistent/roster.csv")).unwrap_err();
        assert!(matches!(err, CsvError::Io(_)));
    }

    #[test]
    fn test_latin1_decoding() {
        // "José" in ISO-8859-1
        let mut bytes = b"first_name\n".to_vec();
        bytes.extend_from_slice(&[0x4A, 0x6F, 0x73, 0xE9]);
        let out = parse_bytes(&bytes).unwrap();
        assert_eq!(out.records.len(), 1);
        let name = out.records[0]["first_name"].as_str().unwrap();
        assert!(name.starts_with("Jos"));
    }
}
