//! Mutation annotation levels: direct fields, derived levels and parse labels.
//!
//! A level name is either `Base` or `Base_label`. `Base` is a column of the
//! mutation table or the name of a registered [`LevelSplitter`]; `label`
//! names a registered [`FieldParser`] that rewrites the table, adding the
//! column `Base_label`, before it is split.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, trace};

use crate::domain::cluster::{Clusterer, MeanShift};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::{MutationTable, Record};

/// Splits a mutation table into branches of a derived level.
pub trait LevelSplitter: Send + Sync {
    /// Direct fields the level is computed from.
    fn source_fields(&self) -> Vec<String>;

    fn split(&self, table: &MutationTable) -> DomainResult<BTreeMap<String, MutationTable>>;
}

/// Rewrites a mutation table before a labeled level is split.
pub trait FieldParser: Send + Sync {
    /// Returns the table with the added column `<base_level>_<label>`.
    fn parse(&self, table: &MutationTable, base_level: &str) -> DomainResult<MutationTable>;
}

/// A level name split into its base and optional parse label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelName<'a> {
    pub full: &'a str,
    pub base: &'a str,
    pub label: Option<&'a str>,
}

impl<'a> LevelName<'a> {
    pub fn parse(full: &'a str) -> DomainResult<Self> {
        let mut parts = full.split('_');
        let base = parts.next().unwrap_or_default();
        let label = parts.next();
        if parts.next().is_some() || base.is_empty() || label == Some("") {
            return Err(DomainError::UnknownLevel(format!(
                "{} (level names are <base> or <base>_<label>)",
                full
            )));
        }
        Ok(Self { full, base, label })
    }
}

/// Registry of derived levels and parse labels, injected into tree
/// construction.
#[derive(Clone)]
pub struct LevelRegistry {
    splitters: BTreeMap<String, Arc<dyn LevelSplitter>>,
    parsers: BTreeMap<String, Arc<dyn FieldParser>>,
}

impl std::fmt::Debug for LevelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelRegistry")
            .field("splitters", &self.splitters.keys().collect::<Vec<_>>())
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self::with_bandwidth((-3.0f64).exp())
    }
}

impl LevelRegistry {
    /// A registry with no derived levels and no parse labels.
    pub fn empty() -> Self {
        Self {
            splitters: BTreeMap::new(),
            parsers: BTreeMap::new(),
        }
    }

    /// The built-in levels, clustering scores with the given bandwidth.
    pub fn with_bandwidth(bandwidth: f64) -> Self {
        Self::empty()
            .register_level("Type", MutationTypeSplitter::new())
            .register_level("Location", ProteinLocationSplitter::new())
            .register_parser("base", IndelBaseParser::new())
            .register_parser("clust", ClusterParser::new(MeanShift::new(bandwidth)))
    }

    pub fn register_level(mut self, name: impl Into<String>, splitter: impl LevelSplitter + 'static) -> Self {
        self.splitters.insert(name.into(), Arc::new(splitter));
        self
    }

    pub fn register_parser(mut self, label: impl Into<String>, parser: impl FieldParser + 'static) -> Self {
        self.parsers.insert(label.into().to_lowercase(), Arc::new(parser));
        self
    }

    pub fn splitter(&self, name: &str) -> Option<&Arc<dyn LevelSplitter>> {
        self.splitters.get(name)
    }

    pub fn parser(&self, label: &str) -> Option<&Arc<dyn FieldParser>> {
        self.parsers.get(&label.to_lowercase())
    }

    /// Checks that `level` can be computed from the columns of `table`.
    pub fn validate(&self, table: &MutationTable, level: &str) -> DomainResult<()> {
        if table.has_column(level) {
            return Ok(());
        }
        let name = LevelName::parse(level)?;
        if let Some(label) = name.label {
            if self.parser(label).is_none() {
                return Err(DomainError::UnknownLevel(format!(
                    "{} (no parser registered for label '{}')",
                    level, label
                )));
            }
        }
        self.source_fields(table, name.base).map(|_| ())
    }

    /// Fields whose values decide whether `base` can split the table.
    fn source_fields(&self, table: &MutationTable, base: &str) -> DomainResult<Vec<String>> {
        if table.has_column(base) {
            return Ok(vec![base.to_string()]);
        }
        let splitter = self
            .splitter(base)
            .ok_or_else(|| DomainError::UnknownLevel(base.to_string()))?;
        let fields = splitter.source_fields();
        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !table.has_column(f))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::MissingDependency {
                level: base.to_string(),
                missing,
            });
        }
        Ok(fields)
    }

    /// Whether any record of `table` has a value this level can split on.
    pub fn has_values(&self, table: &MutationTable, level: &str) -> DomainResult<bool> {
        if table.has_column(level) {
            return Ok(table.any_value(&[level]));
        }
        let name = LevelName::parse(level)?;
        let fields = self.source_fields(table, name.base)?;
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        Ok(table.any_value(&fields))
    }

    /// Splits `table` into the branches of `level`.
    pub fn split(&self, table: &MutationTable, level: &str) -> DomainResult<BTreeMap<String, MutationTable>> {
        // a column named like a labeled level is still a plain column
        if table.has_column(level) {
            trace!(level, "splitting on column");
            return Ok(table.group_by(level));
        }
        let name = LevelName::parse(level)?;
        let parsed;
        let table = match name.label {
            Some(label) => {
                let parser = self.parser(label).ok_or_else(|| {
                    DomainError::UnknownLevel(format!("{} (no parser for label '{}')", level, label))
                })?;
                parsed = parser.parse(table, name.base)?;
                &parsed
            }
            None => table,
        };

        if table.has_column(name.full) {
            trace!(level, "splitting on column");
            return Ok(table.group_by(name.full));
        }
        let splitter = self
            .splitter(name.base)
            .ok_or_else(|| DomainError::UnknownLevel(level.to_string()))?;
        trace!(level, "splitting on derived level");
        splitter.split(table)
    }
}

fn partition<F>(table: &MutationTable, mut classify: F) -> BTreeMap<String, MutationTable>
where
    F: FnMut(&Record) -> Vec<String>,
{
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in table.records() {
        for branch in classify(record) {
            groups.entry(branch).or_default().push(record.clone());
        }
    }
    groups
        .into_iter()
        .map(|(branch, records)| (branch, table.subset(records)))
        .collect()
}

/// `Type`: copy-number changes, point mutations, frame-altering mutations,
/// and everything else.
pub struct MutationTypeSplitter {
    point: Regex,
    frame: Regex,
}

impl Default for MutationTypeSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationTypeSplitter {
    pub fn new() -> Self {
        Self {
            point: Regex::new(r"^p\.[A-Z][0-9]+[A-Z]$").expect("valid point regex"),
            frame: Regex::new(r"^p\..*(?:\*|(?:ins|del))").expect("valid frame regex"),
        }
    }

    fn classify(&self, record: &Record) -> Vec<String> {
        let protein = record.get("Protein");
        let cnv = matches!(record.get("Form"), Some("Gain") | Some("Loss"));
        let point = protein.is_some_and(|p| self.point.is_match(p));
        let frame = protein.is_some_and(|p| self.frame.is_match(p));

        let mut types = Vec::new();
        if cnv {
            types.push("CNV".to_string());
        }
        if point {
            types.push("Point".to_string());
        }
        if frame {
            types.push("Frame".to_string());
        }
        if types.is_empty() {
            types.push("Other".to_string());
        }
        types
    }
}

impl LevelSplitter for MutationTypeSplitter {
    fn source_fields(&self) -> Vec<String> {
        vec!["Gene".into(), "Form".into(), "Protein".into()]
    }

    fn split(&self, table: &MutationTable) -> DomainResult<BTreeMap<String, MutationTable>> {
        Ok(partition(table, |r| self.classify(r)))
    }
}

/// `Location`: the residue position of a protein change.
pub struct ProteinLocationSplitter {
    position: Regex,
}

impl Default for ProteinLocationSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProteinLocationSplitter {
    pub fn new() -> Self {
        Self {
            position: Regex::new(r"^p\.[A-Z]([0-9]+)").expect("valid location regex"),
        }
    }
}

impl LevelSplitter for ProteinLocationSplitter {
    fn source_fields(&self) -> Vec<String> {
        vec!["Protein".into()]
    }

    fn split(&self, table: &MutationTable) -> DomainResult<BTreeMap<String, MutationTable>> {
        Ok(partition(table, |r| match r.get("Protein") {
            Some(protein) => match self.position.captures(protein) {
                Some(caps) => vec![caps[1].to_string()],
                None => vec![protein.to_string()],
            },
            None => Vec::new(),
        }))
    }
}

/// `base` label: merges insertions and deletions of the same form by
/// stripping a trailing `_Del` or `_Ins`.
pub struct IndelBaseParser {
    suffix: Regex,
}

impl Default for IndelBaseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IndelBaseParser {
    pub fn new() -> Self {
        Self {
            suffix: Regex::new(r"_(Del|Ins)$").expect("valid indel regex"),
        }
    }
}

impl FieldParser for IndelBaseParser {
    fn parse(&self, table: &MutationTable, base_level: &str) -> DomainResult<MutationTable> {
        if !table.has_column(base_level) {
            return Err(DomainError::MissingDependency {
                level: format!("{}_base", base_level),
                missing: vec![base_level.to_string()],
            });
        }
        let column = format!("{}_base", base_level);
        let records = table
            .records()
            .iter()
            .map(|r| {
                let value = r
                    .get(base_level)
                    .map(|v| self.suffix.replace(v, "").into_owned());
                let mut rewritten = r.clone();
                rewritten.set(column.clone(), value);
                rewritten
            })
            .collect();
        Ok(table.with_column(column, records))
    }
}

/// `clust` label: discretizes a numeric field into clusters of similar scores.
pub struct ClusterParser<C: Clusterer> {
    clusterer: C,
}

impl<C: Clusterer> ClusterParser<C> {
    pub fn new(clusterer: C) -> Self {
        Self { clusterer }
    }
}

impl<C: Clusterer> FieldParser for ClusterParser<C> {
    fn parse(&self, table: &MutationTable, base_level: &str) -> DomainResult<MutationTable> {
        let column = format!("{}_clust", base_level);
        if !table.has_column(base_level) {
            return Err(DomainError::MissingDependency {
                level: column,
                missing: vec![base_level.to_string()],
            });
        }

        let mut scored = Vec::new();
        for (i, record) in table.records().iter().enumerate() {
            if let Some(raw) = record.get(base_level) {
                let score: f64 = raw.trim().parse().map_err(|_| {
                    DomainError::MalformedInput(format!(
                        "{} value '{}' of sample {} is not numeric",
                        base_level, raw, record.sample
                    ))
                })?;
                scored.push((i, score));
            }
        }

        let values: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();
        let clustering = self.clusterer.fit(&values)?;
        debug!(level = base_level, clusters = clustering.centers.len(), "clustered scores");

        let mut labels: Vec<Option<String>> = vec![None; table.len()];
        for ((i, _), label) in scored.iter().zip(&clustering.labels) {
            let center = clustering.centers.get(*label).copied().unwrap_or_default();
            labels[*i] = Some(format!("{}_{}", base_level, (center * 100.0).round() / 100.0));
        }

        let records = table
            .records()
            .iter()
            .zip(labels)
            .map(|(r, label)| {
                let mut rewritten = r.clone();
                rewritten.set(column.clone(), label);
                rewritten
            })
            .collect();
        Ok(table.with_column(column, records))
    }
}
