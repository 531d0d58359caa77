//! Re-serialization of a validated catalogue.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{ColumnMap, Schema, ID};
use crate::table::{write_csv, ParsedTable};
use crate::Result;

/// Placeholder written for blank or absent values.
pub const NULL: &str = "null";

/// Values of the columns the schema does not know, for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraRecord {
    pub line: usize,
    pub id: String,
    /// Extra column values keyed by column name, in column order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Side channel for columns outside the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraColumns {
    /// Names of the extra columns, as used for the record keys.
    ///
    /// This is the original header unless it clashes with `line`, `id` or an
    /// earlier extra column, in which case `_N` is appended with `N` the
    /// 1-based column number.
    pub columns: Vec<String>,
    /// One record per data row.
    pub records: Vec<ExtraRecord>,
}

impl ExtraColumns {
    /// Serialize the records as the JSON array sent alongside the upload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }
}

/// A validated catalogue in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCatalogue {
    /// Output header row.
    pub headers: Vec<String>,
    /// Remapped rows with blanks replaced by `null`.
    pub rows: Vec<Vec<String>>,
    /// Columns outside the schema, if the input had any.
    pub extra: Option<ExtraColumns>,
}

impl NormalizedCatalogue {
    pub(crate) fn build(table: &ParsedTable, schema: &Schema, columns: &ColumnMap) -> Self {
        let headers = schema.expected().iter().map(|h| h.to_string()).collect();
        let data_rows: Vec<_> = table.rows.iter().filter(|row| !row.is_blank()).collect();

        let rows = data_rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|(_, index)| match index.map(|i| row.get(i)) {
                        Some(value) if !value.is_empty() => value.to_string(),
                        _ => NULL.to_string(),
                    })
                    .collect()
            })
            .collect();

        let extra_indices: Vec<usize> = (0..table.headers.len())
            .filter(|&i| !columns.is_mapped(i))
            .collect();

        let extra = if extra_indices.is_empty() {
            None
        } else {
            let id_column = columns.index_of(ID);
            let keys = extra_keys(&table.headers, &extra_indices);
            let records = data_rows
                .iter()
                .map(|row| {
                    let fields = keys
                        .iter()
                        .zip(&extra_indices)
                        .map(|(key, &i)| (key.clone(), Value::String(row.get(i).to_string())))
                        .collect();
                    ExtraRecord {
                        line: row.line,
                        id: id_column.map(|i| row.get(i)).unwrap_or("").to_string(),
                        fields,
                    }
                })
                .collect();

            Some(ExtraColumns {
                columns: keys,
                records,
            })
        };

        Self {
            headers,
            rows,
            extra,
        }
    }

    /// The catalogue as CSV text.
    pub fn to_csv(&self) -> Result<String> {
        write_csv(std::iter::once(&self.headers).chain(&self.rows))
    }
}

/// Unique record keys for the extra columns.
fn extra_keys(headers: &[String], extra_indices: &[usize]) -> Vec<String> {
    let mut used: FxHashSet<String> = ["line", ID].into_iter().map(String::from).collect();

    extra_indices
        .iter()
        .map(|&i| {
            let header = &headers[i];
            let mut key = header.clone();
            let mut n = i + 1;
            while used.contains(&key) {
                key = format!("{header}_{n}");
                n += 1;
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_csv;

    #[test]
    fn test_reorders_and_fills_nulls() {
        let table = parse_csv("Name,id,Brand,Colour\nShirt,7,,red\n\n");
        let schema = Schema::new(false);
        let columns = schema.resolve(&table.headers);

        let catalogue = NormalizedCatalogue::build(&table, &schema, &columns);

        assert_eq!(catalogue.headers.len(), 15);
        assert_eq!(catalogue.rows.len(), 1);
        assert_eq!(catalogue.rows[0][0], "7");
        assert_eq!(catalogue.rows[0][1], "Shirt");
        assert_eq!(catalogue.rows[0][2], NULL);
        assert!(catalogue.rows[0][3..].iter().all(|v| v == NULL));

        let extra = catalogue.extra.unwrap();
        assert_eq!(extra.columns, vec!["Colour"]);
        assert_eq!(extra.records[0].line, 2);
        assert_eq!(extra.records[0].id, "7");
        assert_eq!(
            extra.to_json().unwrap(),
            r#"[{"line":2,"id":"7","Colour":"red"}]"#
        );
    }

    #[test]
    fn test_no_extra_columns() {
        let table = parse_csv("id,Name\n1,Cap\n");
        let schema = Schema::new(false);
        let columns = schema.resolve(&table.headers);

        let catalogue = NormalizedCatalogue::build(&table, &schema, &columns);
        assert!(catalogue.extra.is_none());
        assert!(catalogue
            .to_csv()
            .unwrap()
            .starts_with("id,Name,Brand,MRP,Discount %,"));
    }

    #[test]
    fn test_extra_keys_never_shadow_record_fields() {
        let table = parse_csv("id,Name,line,id,Fabric,Fabric\n7,Tee,L1,dup,cotton,linen\n");
        let schema = Schema::new(false);
        let columns = schema.resolve(&table.headers);

        let extra = NormalizedCatalogue::build(&table, &schema, &columns)
            .extra
            .unwrap();

        assert_eq!(extra.columns, vec!["line_3", "id_4", "Fabric", "Fabric_6"]);
        assert_eq!(
            extra.to_json().unwrap(),
            r#"[{"line":2,"id":"7","line_3":"L1","id_4":"dup","Fabric":"cotton","Fabric_6":"linen"}]"#
        );
    }
}
