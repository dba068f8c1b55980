//! The validated dataset and its exports.
//!
//! A [`Dataset`] owns one validated 360Giving document together with
//! the [`SchemaIndex`] it was validated against. Construction is
//! fail-fast: any surfaced validation error rejects the whole load and
//! no partially-valid dataset ever exists.
//!
//! Exports compose the flattener and the field-name mapper: every
//! grant flattens to one [`FlatRow`], the union of field names across
//! all rows (in first-seen order) becomes the header, and the header
//! optionally passes through the schema's rename rules before a
//! tabular writer consumes it.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{ExportError, ExportResult, LoadError, LoadResult};
use crate::flatten::FlatRow;
use crate::grant::Grant;
use crate::mapper::{map_field_names, FieldNameMap};
use crate::schema::SchemaIndex;

/// One loaded, validated 360Giving dataset.
#[derive(Debug)]
pub struct Dataset {
    config: Config,
    schema: SchemaIndex,
    data: Value,
}

impl Dataset {
    /// Validate `document` against `schema` and keep it on success.
    ///
    /// Fails with [`LoadError::Invalid`] carrying every surfaced
    /// failure when validation does not come back clean.
    pub fn load(document: Value, schema: SchemaIndex, config: Config) -> LoadResult<Self> {
        let errors = schema.validate(&document);
        if !errors.is_empty() {
            return Err(LoadError::Invalid { errors });
        }
        let dataset = Self {
            config,
            schema,
            data: document,
        };
        tracing::info!(grants = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// The schema this dataset was validated against.
    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    /// The raw nested document.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Number of grants in the dataset.
    pub fn len(&self) -> usize {
        self.grant_values().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the grants in document order. Restartable: each call
    /// yields a fresh iterator over the same records.
    pub fn grants(&self) -> impl Iterator<Item = Grant> + '_ {
        self.grant_values()
            .into_iter()
            .flatten()
            .filter_map(Grant::from_value)
    }

    fn grant_values(&self) -> Option<&Vec<Value>> {
        self.data
            .get(&self.config.root_id)
            .and_then(Value::as_array)
    }

    // =========================================================================
    // Flat export
    // =========================================================================

    /// Flatten every grant and collect the union of field names.
    ///
    /// Field names accumulate in first-seen order across the whole
    /// dataset; grants missing an optional field simply have no entry
    /// for it in their row.
    pub fn to_flat(&self) -> (Vec<FlatRow>, Vec<String>) {
        let mut rows = Vec::new();
        let mut fieldnames: Vec<String> = Vec::new();
        for grant in self.grants() {
            let row = grant.to_flat();
            for field in row.keys() {
                if !fieldnames.contains(field) {
                    fieldnames.push(field.clone());
                }
            }
            rows.push(row);
        }
        (rows, fieldnames)
    }

    /// Map flat field names onto display names using the schema's
    /// rename rules.
    pub fn convert_fieldnames(&self, fieldnames: &[String]) -> FieldNameMap {
        map_field_names(fieldnames, self.schema.rename_rules())
    }

    // =========================================================================
    // JSON output
    // =========================================================================

    /// Write the nested document as pretty-printed JSON (4-space
    /// indent, non-ASCII characters preserved literally).
    pub fn to_json_writer<W: Write>(&self, writer: W) -> ExportResult<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.data.serialize(&mut serializer)?;
        Ok(())
    }

    pub fn to_json_path(&self, path: &Path) -> ExportResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.to_json_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // CSV output
    // =========================================================================

    /// Write one header row plus one row per grant.
    ///
    /// With `convert_fieldnames` the header carries schema titles,
    /// otherwise the generated flat field names. Fields absent from a
    /// grant are empty cells.
    pub fn to_csv_writer<W: Write>(&self, writer: W, convert_fieldnames: bool) -> ExportResult<()> {
        let (rows, fieldnames) = self.to_flat();
        let mut csv_writer = csv::Writer::from_writer(writer);

        if convert_fieldnames {
            let header = self.convert_fieldnames(&fieldnames);
            csv_writer.write_record(header.display_names())?;
        } else {
            csv_writer.write_record(&fieldnames)?;
        }

        for row in &rows {
            let record: Vec<String> = fieldnames
                .iter()
                .map(|field| row.get(field).map(cell_text).unwrap_or_default())
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: &Path, convert_fieldnames: bool) -> ExportResult<()> {
        let file = std::fs::File::create(path)?;
        self.to_csv_writer(std::io::BufWriter::new(file), convert_fieldnames)
    }

    // =========================================================================
    // Spreadsheet output
    // =========================================================================

    /// Write a single-worksheet spreadsheet.
    ///
    /// `multiple_sheets` (one worksheet per entity) is an unimplemented
    /// variant: it fails with [`ExportError::Unsupported`] and writes
    /// nothing.
    pub fn to_xlsx_path(
        &self,
        path: &Path,
        multiple_sheets: bool,
        convert_fieldnames: bool,
    ) -> ExportResult<()> {
        if multiple_sheets {
            return Err(ExportError::Unsupported("multi-sheet spreadsheet output"));
        }

        let (rows, fieldnames) = self.to_flat();
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();

        if convert_fieldnames {
            let header = self.convert_fieldnames(&fieldnames);
            for (col, name) in header.display_names().iter().enumerate() {
                worksheet.write_string(0, col as u16, *name)?;
            }
        } else {
            for (col, name) in fieldnames.iter().enumerate() {
                worksheet.write_string(0, col as u16, name)?;
            }
        }

        for (index, row) in rows.iter().enumerate() {
            let row_number = (index + 1) as u32;
            for (col, field) in fieldnames.iter().enumerate() {
                let col = col as u16;
                match row.get(field) {
                    Some(Value::String(text)) => {
                        worksheet.write_string(row_number, col, text)?;
                    }
                    Some(Value::Number(number)) => {
                        if let Some(float) = number.as_f64() {
                            worksheet.write_number(row_number, col, float)?;
                        }
                    }
                    Some(Value::Bool(flag)) => {
                        worksheet.write_boolean(row_number, col, *flag)?;
                    }
                    Some(Value::Null) | None => {}
                    // Flattening leaves no containers behind.
                    Some(other) => {
                        worksheet.write_string(row_number, col, other.to_string())?;
                    }
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }

    // =========================================================================
    // In-memory table
    // =========================================================================

    /// Produce a dense in-memory table for downstream analysis.
    ///
    /// Rows are in grant order and padded with `Value::Null` for
    /// fields a grant does not carry.
    pub fn to_table(&self, convert_fieldnames: bool) -> Table {
        let (rows, fieldnames) = self.to_flat();
        let header = if convert_fieldnames {
            self.convert_fieldnames(&fieldnames)
                .display_names()
                .iter()
                .map(|name| name.to_string())
                .collect()
        } else {
            fieldnames.clone()
        };
        let data = rows
            .iter()
            .map(|row| {
                fieldnames
                    .iter()
                    .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Table {
            fieldnames: header,
            rows: data,
        }
    }
}

/// Dense tabular view of a dataset: one column per flat field, one row
/// per grant.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    /// Column names, in first-seen field order.
    pub fieldnames: Vec<String>,
    /// Row-major cell values; absent fields are `Value::Null`.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// All values of one column, by column name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.fieldnames.iter().position(|field| field == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render one flat value as CSV cell text.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::package_schema;
    use serde_json::json;

    fn dataset(document: Value) -> LoadResult<Dataset> {
        let schema = SchemaIndex::from_value(&package_schema(), "grants").unwrap();
        Dataset::load(document, schema, Config::default())
    }

    fn sample() -> Dataset {
        dataset(json!({ "grants": [
            {
                "id": "360G-1",
                "title": "Roof repair",
                "amountAwarded": 1500,
                "recipientOrganization": [ { "id": "GB-CHC-1", "name": "Example Trust" } ]
            },
            {
                "id": "360G-2",
                "title": "New minibus",
                "awardDate": "2024-03-01"
            }
        ] }))
        .unwrap()
    }

    #[test]
    fn test_invalid_document_rejected_with_all_errors() {
        let err = dataset(json!({ "grants": [
            { "id": "360G-1" },
            { "id": "360G-2", "title": "ok", "amountAwarded": "a lot" }
        ] }))
        .unwrap_err();
        let failures = err.validation_failures();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().any(|f| f.keyword == "required"));
        assert!(failures.iter().any(|f| f.keyword == "type"));
    }

    #[test]
    fn test_grants_iteration_restartable() {
        let dataset = sample();
        let first: Vec<String> = dataset
            .grants()
            .map(|g| g.id().unwrap().to_string())
            .collect();
        let second: Vec<String> = dataset
            .grants()
            .map(|g| g.id().unwrap().to_string())
            .collect();
        assert_eq!(first, vec!["360G-1", "360G-2"]);
        assert_eq!(first, second);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_to_flat_union_of_fields() {
        let (rows, fieldnames) = sample().to_flat();
        assert_eq!(
            fieldnames,
            vec![
                "id",
                "title",
                "amountAwarded",
                "recipientOrganization.0.id",
                "recipientOrganization.0.name",
                "awardDate",
            ]
        );
        // First grant has no awardDate, second has no organisation.
        assert!(rows[0].get("awardDate").is_none());
        assert!(rows[1].get("recipientOrganization.0.name").is_none());
    }

    #[test]
    fn test_csv_output_with_display_names() {
        let mut buffer = Vec::new();
        sample().to_csv_writer(&mut buffer, true).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "Identifier,Title,Amount Awarded,Recipient Org:0:Identifier,Recipient Org:0:Name,Award Date"
        );
        assert_eq!(
            lines.next().unwrap(),
            "360G-1,Roof repair,1500,GB-CHC-1,Example Trust,"
        );
        assert_eq!(lines.next().unwrap(), "360G-2,New minibus,,,,2024-03-01");
    }

    #[test]
    fn test_csv_output_raw_fieldnames() {
        let mut buffer = Vec::new();
        sample().to_csv_writer(&mut buffer, false).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("id,title,amountAwarded,recipientOrganization.0.id"));
    }

    #[test]
    fn test_json_round_trip_revalidates() {
        let dataset = sample();
        let mut buffer = Vec::new();
        dataset.to_json_writer(&mut buffer).unwrap();

        let reparsed: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(&reparsed, dataset.data());

        let schema = SchemaIndex::from_value(&package_schema(), "grants").unwrap();
        let reloaded = Dataset::load(reparsed, schema, Config::default()).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_json_output_preserves_non_ascii() {
        let dataset = dataset(json!({ "grants": [
            { "id": "360G-1", "title": "Café repair" }
        ] }))
        .unwrap();
        let mut buffer = Vec::new();
        dataset.to_json_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Café repair"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_multi_sheet_xlsx_unsupported_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.xlsx");
        let err = sample().to_xlsx_path(&path, true, true).unwrap_err();
        assert!(matches!(err, ExportError::Unsupported(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_single_sheet_xlsx_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.xlsx");
        sample().to_xlsx_path(&path, false, true).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_to_table_pads_missing_with_null() {
        let table = sample().to_table(false);
        assert_eq!(table.len(), 2);
        assert_eq!(table.fieldnames[5], "awardDate");
        assert_eq!(table.rows[0][5], Value::Null);
        assert_eq!(table.rows[1][5], json!("2024-03-01"));

        let ids = table.column("id").unwrap();
        assert_eq!(ids, vec![&json!("360G-1"), &json!("360G-2")]);
        assert!(table.column("nonexistent").is_none());
    }

    #[test]
    fn test_to_table_with_display_names() {
        let table = sample().to_table(true);
        assert_eq!(table.fieldnames[0], "Identifier");
        assert_eq!(table.fieldnames[3], "Recipient Org:0:Identifier");
    }
}
