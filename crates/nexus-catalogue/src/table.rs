//! CSV reading and writing.

use csv::{Position, QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use tracing::warn;

use crate::Result;

/// A data row of a parsed CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based source line the row starts on; the header row is line 1.
    pub line: usize,
    /// Trimmed field values. May be shorter or longer than the header row.
    pub values: Vec<String>,
}

impl Row {
    /// Value at a column, or `""` for columns this row does not reach.
    #[inline]
    pub fn get(&self, column: usize) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// Check if every value in the row is empty.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|value| value.is_empty())
    }
}

/// A CSV file split into its header row and data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Header names as they appear in the first row, trimmed.
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<Row>,
}

impl ParsedTable {
    /// Serialize back to CSV text.
    ///
    /// Every record, including the last, ends with `\n`.
    pub fn to_csv(&self) -> Result<String> {
        write_csv(
            std::iter::once(self.headers.as_slice())
                .chain(self.rows.iter().map(|row| row.values.as_slice())),
        )
    }
}

/// Parse CSV text.
///
/// Records end at `\n`, `\r\n` or a lone `\r`. Quoted fields may contain
/// commas, doubled quotes and line breaks. Every field is trimmed, rows may
/// be ragged, and empty lines produce no row.
pub fn parse_csv(text: &str) -> ParsedTable {
    // Lone `\r` ends a record but does not advance the reader's line count.
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let bytes = text.as_bytes();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut records: Vec<(usize, Vec<String>)> = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, records = records.len(), "stopped reading malformed CSV");
                break;
            }
        };

        let line = record
            .position()
            .map_or(records.len() + 1, |pos| record_line(bytes, pos));
        records.push((line, record.iter().map(str::to_string).collect()));
    }

    let mut records = records.into_iter();
    let headers = records.next().map(|(_, values)| values).unwrap_or_default();
    let rows = records.map(|(line, values)| Row { line, values }).collect();

    ParsedTable { headers, rows }
}

/// Line a record starts on.
///
/// The reader may report the position before the empty lines it skipped,
/// so those are counted forward from there.
fn record_line(bytes: &[u8], pos: &Position) -> usize {
    let skipped = usize::try_from(pos.byte())
        .ok()
        .and_then(|start| bytes.get(start..))
        .map_or(0, |rest| rest.iter().take_while(|&&b| b == b'\n').count());
    pos.line() as usize + skipped
}

/// Write records as CSV, quoting only fields that need it.
pub(crate) fn write_csv<I, R, S>(records: I) -> Result<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for record in records {
        writer.write_record(record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(table: &ParsedTable) -> Vec<Vec<String>> {
        table.rows.iter().map(|row| row.values.clone()).collect()
    }

    #[test]
    fn test_basic_table() {
        let table = parse_csv("id, Name ,Brand\n1,Shirt,H&M\n2, Jeans ,Levi's\n");

        assert_eq!(table.headers, vec!["id", "Name", "Brand"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
        assert_eq!(table.rows[1].values, vec!["2", "Jeans", "Levi's"]);
    }

    #[test]
    fn test_line_endings() {
        let crlf = parse_csv("a,b\r\n1,2\r\n3,4");
        let cr = parse_csv("a,b\r1,2\r3,4\r");
        let lf = parse_csv("a,b\n1,2\n3,4\n");
        assert_eq!(crlf, cr);
        assert_eq!(crlf, lf);
        assert_eq!(crlf.rows[1].values, vec!["3", "4"]);
        assert_eq!(cr.rows[1].line, 3);
    }

    #[test]
    fn test_quoted_fields() {
        let table = parse_csv("name,desc\n\"Smith, J\",\"He said \"\"hi\"\"\nthen left\"\n");

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].values[0], "Smith, J");
        assert_eq!(table.rows[0].values[1], "He said \"hi\"\nthen left");
    }

    #[test]
    fn test_ragged_rows_and_blank_lines() {
        let table = parse_csv("a,b,c\n1\n\n\n1,2,3,4\n , \n");

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].values, vec!["1"]);
        assert_eq!(table.rows[0].get(2), "");
        assert_eq!(table.rows[1].line, 5);
        assert_eq!(table.rows[1].values.len(), 4);
        assert!(table.rows[2].is_blank());
        assert_eq!(table.rows[2].line, 6);
    }

    #[test]
    fn test_line_follows_multiline_field() {
        let table = parse_csv("id,desc\n1,\"two\nlines\"\n2,plain\n");

        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn test_empty_input() {
        let table = parse_csv("");
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_quotes_only_when_needed() {
        let table = ParsedTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![Row {
                line: 2,
                values: vec!["plain".into(), "a,b".into(), "say \"x\"".into(), "two\nlines".into()],
            }],
        };

        assert_eq!(
            table.to_csv().unwrap(),
            "a,b\nplain,\"a,b\",\"say \"\"x\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_serialize_then_parse_is_stable() {
        let inputs = [
            "id,Name,Description\n1,\"Shirt, slim\",\"Soft \"\"organic\"\" cotton\nwash cold\"\n2,Cap,\n",
            "a,b\n\"x\"\"\",\"\"\"y\"\n\n,\n",
            "h\n\"line1\r\nline2\"\n",
        ];

        for input in inputs {
            let table = parse_csv(input);
            let reparsed = parse_csv(&table.to_csv().unwrap());
            assert_eq!(reparsed.headers, table.headers, "input: {input:?}");
            assert_eq!(values(&reparsed), values(&table), "input: {input:?}");
        }
    }
}
