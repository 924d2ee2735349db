//! Mutation records and the table they are grouped in.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Default name of the sample identifier field.
pub const SAMPLE_FIELD: &str = "Sample";

/// Set of sample identifiers.
pub type SampleSet = BTreeSet<String>;

/// Raw row as delivered by a record source: field name to optional value.
pub type Row = BTreeMap<String, Option<String>>;

/// One mutation occurring in one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub sample: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Option<String>>,
}

impl Record {
    pub fn new(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a non-null field.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), Some(value.into()));
        self
    }

    /// Builder-style setter for an explicitly null field.
    pub fn with_null(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), None);
        self
    }

    /// Value of a field; missing and null fields both read as `None`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<String>) {
        self.fields.insert(field.into(), value);
    }
}

/// A collection of records together with the columns they are addressed by.
///
/// Columns belong to the table, not to single records: a subset of a table
/// keeps every column of its parent even if no remaining record has a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationTable {
    columns: BTreeSet<String>,
    records: Vec<Record>,
}

impl MutationTable {
    /// Builds a table whose columns are every field seen in `records`.
    pub fn new(records: Vec<Record>) -> Self {
        let columns = records
            .iter()
            .flat_map(|r| r.fields.keys().cloned())
            .collect();
        Self { columns, records }
    }

    /// Builds a table from raw rows, taking the sample id from `sample_field`.
    pub fn from_rows(rows: Vec<Row>, sample_field: &str) -> DomainResult<Self> {
        let mut columns = BTreeSet::new();
        let mut records = Vec::with_capacity(rows.len());

        for (i, mut row) in rows.into_iter().enumerate() {
            let sample = match row.remove(sample_field) {
                Some(Some(sample)) => sample,
                Some(None) => {
                    return Err(DomainError::MalformedInput(format!(
                        "row {} has a null '{}' field",
                        i, sample_field
                    )))
                }
                None => {
                    return Err(DomainError::MalformedInput(format!(
                        "row {} has no '{}' field",
                        i, sample_field
                    )))
                }
            };
            columns.extend(row.keys().cloned());
            records.push(Record {
                sample,
                fields: row,
            });
        }

        Ok(Self { columns, records })
    }

    /// A table over `records` sharing this table's columns.
    pub fn subset(&self, records: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    /// Replaces the records and registers `column` as a new column.
    pub fn with_column(&self, column: impl Into<String>, records: Vec<Record>) -> Self {
        let mut columns = self.columns.clone();
        columns.insert(column.into());
        Self { columns, records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record has a non-null value in any of `fields`.
    pub fn any_value(&self, fields: &[&str]) -> bool {
        self.records
            .iter()
            .any(|r| fields.iter().any(|f| r.get(f).is_some()))
    }

    pub fn samples(&self) -> SampleSet {
        self.records.iter().map(|r| r.sample.clone()).collect()
    }

    /// Groups records by the value of `column`; records with a null value
    /// belong to no group.
    pub fn group_by(&self, column: &str) -> BTreeMap<String, MutationTable> {
        let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        for record in &self.records {
            if let Some(value) = record.get(column) {
                groups
                    .entry(value.to_string())
                    .or_default()
                    .push(record.clone());
            }
        }
        groups
            .into_iter()
            .map(|(value, records)| (value, self.subset(records)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[(&str, Option<&str>)]) -> Row {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn given_rows_without_sample_field_when_building_table_then_fails() {
        let rows = vec![row(&[("Gene", Some("TP53"))])];
        let err = MutationTable::from_rows(rows, SAMPLE_FIELD).unwrap_err();
        assert!(matches!(err, DomainError::MalformedInput(_)));
    }

    #[test]
    fn given_null_values_when_grouping_then_drops_them() {
        let table = MutationTable::new(vec![
            Record::new("S1").with("Form", "Missense"),
            Record::new("S2").with_null("Form"),
            Record::new("S3"),
        ]);
        let groups = table.group_by("Form");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Missense"].samples(), SampleSet::from(["S1".to_string()]));
        assert!(groups["Missense"].has_column("Form"));
    }

    #[test]
    fn given_subset_when_values_missing_then_columns_survive() {
        let table = MutationTable::new(vec![
            Record::new("S1").with("Gene", "TP53").with("Exon", "3"),
            Record::new("S2").with("Gene", "KRAS"),
        ]);
        let kras = table.subset(vec![table.records()[1].clone()]);
        assert!(kras.has_column("Exon"));
        assert!(!kras.any_value(&["Exon"]));
    }
}
