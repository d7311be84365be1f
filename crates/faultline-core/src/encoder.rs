//! Delimited text encoder.
//!
//! Output format, kept byte-compatible with existing downstream consumers:
//! - first line: column names in the order of the first row, joined by the
//!   delimiter
//! - one line per row, values in header order, no trailing delimiter
//! - a value containing the delimiter is wrapped in double quotes
//! - every line break inside a value becomes a single space
//!
//! Embedded double quotes are NOT escaped. A value such as `say "hi", bye`
//! is emitted as `"say "hi", bye"`, which an RFC 4180 reader will not split
//! back the way it was written. This is a known limitation of the format.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::ExtractError;
use crate::row::{Row, RowSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    Lf,
    CrLf,
}

impl LineTerminator {
    /// The host platform's line break.
    pub fn platform() -> Self {
        if cfg!(windows) {
            LineTerminator::CrLf
        } else {
            LineTerminator::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

impl Default for LineTerminator {
    fn default() -> Self {
        Self::platform()
    }
}

/// Encoded output of one run, complete and immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    data: Vec<u8>,
    rows: u64,
}

impl EncodedPayload {
    pub fn new(data: Vec<u8>, rows: u64) -> Self {
        Self { data, rows }
    }

    /// Number of data rows, excluding the header line.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[derive(Debug, Clone)]
pub struct DelimitedEncoder {
    delimiter: char,
    terminator: LineTerminator,
}

impl Default for DelimitedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedEncoder {
    /// Comma-delimited, platform line breaks.
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            terminator: LineTerminator::platform(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn terminator(&self) -> LineTerminator {
        self.terminator
    }

    /// Drain `rows` into delimited text.
    ///
    /// The only failure is an error raised by the sequence itself, which is
    /// passed through unchanged. An empty sequence yields an empty payload
    /// with no header line.
    pub async fn encode(&self, mut rows: RowSequence<'_>) -> Result<EncodedPayload, ExtractError> {
        let mut out = String::new();
        let mut header: Option<Arc<[String]>> = None;
        let mut count = 0u64;

        while let Some(next) = rows.next_row().await {
            let row = next?;
            let columns = header.get_or_insert_with(|| row.shared_columns().clone());
            if count == 0 {
                self.push_header(&mut out, columns);
            }
            self.push_row(&mut out, columns, &row);
            count += 1;
        }

        Ok(EncodedPayload::new(out.into_bytes(), count))
    }

    /// Apply the quoting and line-break rules to a single value.
    pub fn escape_field<'v>(&self, value: &'v str) -> Cow<'v, str> {
        let mut field = Cow::Borrowed(value);
        if value.contains(self.delimiter) {
            field = Cow::Owned(format!("\"{}\"", value));
        }
        if field.contains(['\r', '\n']) {
            field = Cow::Owned(field.replace("\r\n", " ").replace(['\r', '\n'], " "));
        }
        field
    }

    fn push_header(&self, out: &mut String, columns: &[String]) {
        for (i, name) in columns.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            out.push_str(name);
        }
        out.push_str(self.terminator.as_str());
    }

    fn push_row(&self, out: &mut String, header: &Arc<[String]>, row: &Row) {
        // Rows of one result set share their column list; anything else is
        // realigned to the header by name.
        let same_shape =
            Arc::ptr_eq(header, row.shared_columns()) || &header[..] == row.columns();

        for (i, name) in header.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            let value = if same_shape {
                row.values().get(i).map(String::as_str)
            } else {
                row.get(name)
            };
            out.push_str(&self.escape_field(value.unwrap_or_default()));
        }
        out.push_str(self.terminator.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lf() -> DelimitedEncoder {
        DelimitedEncoder::new().with_terminator(LineTerminator::Lf)
    }

    fn sample_rows() -> Vec<Row> {
        let columns: Arc<[String]> = vec!["id".to_string(), "value".to_string(), "ts".to_string()].into();
        vec![
            Row::new(columns.clone(), vec!["1".into(), "a,b".into(), "2024-03-01 04:10:00".into()]),
            Row::new(columns.clone(), vec!["2".into(), "normal".into(), "2024-03-01 04:20:00".into()]),
            Row::new(columns, vec!["3".into(), "normal".into(), "2024-03-01 04:55:00".into()]),
        ]
    }

    #[tokio::test]
    async fn test_encode_three_rows() {
        let payload = lf()
            .encode(RowSequence::from_rows(sample_rows()))
            .await
            .unwrap();
        let text = String::from_utf8(payload.as_bytes().to_vec()).unwrap();
        assert_eq!(
            text,
            "id,value,ts\n\
             1,\"a,b\",2024-03-01 04:10:00\n\
             2,normal,2024-03-01 04:20:00\n\
             3,normal,2024-03-01 04:55:00\n"
        );
        assert_eq!(payload.rows(), 3);
        assert_eq!(payload.len(), text.len());
    }

    #[tokio::test]
    async fn test_line_count_is_rows_plus_header() {
        let columns: Arc<[String]> = vec!["n".to_string()].into();
        let rows: Vec<Row> = (0..250)
            .map(|i| Row::new(columns.clone(), vec![i.to_string()]))
            .collect();
        let payload = lf().encode(RowSequence::from_rows(rows)).await.unwrap();
        let text = String::from_utf8(payload.into_bytes()).unwrap();
        assert_eq!(text.lines().count(), 251);
        assert_eq!(text.lines().next(), Some("n"));
        assert!(text.ends_with("249\n"));
        assert!(!text.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_empty_sequence_yields_empty_payload() {
        let payload = lf().encode(RowSequence::empty()).await.unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.rows(), 0);
    }

    #[test]
    fn test_escape_delimiter() {
        let enc = lf();
        assert_eq!(enc.escape_field("plain"), "plain");
        assert_eq!(enc.escape_field("a,b"), "\"a,b\"");
        assert_eq!(enc.escape_field(",,"), "\",,\"");
    }

    #[test]
    fn test_escape_line_breaks() {
        let enc = lf();
        assert_eq!(enc.escape_field("line1\r\nline2"), "line1 line2");
        assert_eq!(enc.escape_field("a\nb\rc"), "a b c");
        assert_eq!(enc.escape_field("x,\ny"), "\"x, y\"");
    }

    #[test]
    fn test_embedded_quotes_left_alone() {
        let enc = lf();
        assert_eq!(enc.escape_field("say \"hi\""), "say \"hi\"");
        assert_eq!(enc.escape_field("say \"hi\", bye"), "\"say \"hi\", bye\"");
    }

    #[tokio::test]
    async fn test_crlf_terminator() {
        let enc = DelimitedEncoder::new().with_terminator(LineTerminator::CrLf);
        let rows = vec![Row::from_pairs([("a", "1"), ("b", "two\nlines")])];
        let payload = enc.encode(RowSequence::from_rows(rows)).await.unwrap();
        assert_eq!(payload.as_bytes(), b"a,b\r\n1,two lines\r\n");
    }

    #[tokio::test]
    async fn test_rows_realigned_to_header_order() {
        let rows = vec![
            Row::from_pairs([("id", "1"), ("name", "pump")]),
            Row::from_pairs([("name", "valve"), ("id", "2")]),
            Row::from_pairs([("id", "3")]),
        ];
        let payload = lf().encode(RowSequence::from_rows(rows)).await.unwrap();
        assert_eq!(payload.as_bytes(), b"id,name\n1,pump\n2,valve\n3,\n");
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let enc = lf().with_delimiter(';');
        let rows = vec![Row::from_pairs([("a", "x;y"), ("b", "p,q")])];
        let payload = enc.encode(RowSequence::from_rows(rows)).await.unwrap();
        assert_eq!(payload.as_bytes(), b"a;b\n\"x;y\";p,q\n");
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        use futures::stream::{self, StreamExt};

        let inner = stream::iter(vec![
            Ok(Row::from_pairs([("id", "1")])),
            Err(ExtractError::Read("connection reset".into())),
        ])
        .boxed();
        let err = lf().encode(RowSequence::new(inner)).await.unwrap_err();
        assert_eq!(err, ExtractError::Read("connection reset".into()));
    }

    #[tokio::test]
    async fn test_downstream_reader_recovers_comma_fields() {
        let payload = lf()
            .encode(RowSequence::from_rows(sample_rows()))
            .await
            .unwrap();
        let mut reader = csv::Reader::from_reader(payload.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(headers, ["id", "value", "ts"]);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][1], "a,b");
        assert_eq!(&records[1][1], "normal");
    }

    #[tokio::test]
    async fn test_embedded_quote_with_delimiter_is_a_known_limitation() {
        let rows = vec![Row::from_pairs([("id", "1"), ("note", "say \"hi\", bye")])];
        let payload = lf().encode(RowSequence::from_rows(rows)).await.unwrap();
        assert_eq!(payload.as_bytes(), b"id,note\n1,\"say \"hi\", bye\"\n");

        let mut reader = csv::Reader::from_reader(payload.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_ne!(&record[1], "say \"hi\", bye");
    }
}
