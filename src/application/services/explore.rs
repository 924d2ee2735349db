//! Mutation tree exploration service
//!
//! Loads record files, builds trees over the configured levels and answers
//! type queries against them.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::records::RecordFormat;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{LevelRegistry, MuTree, MuType, MutationTable, SampleSet, SetKey};
use crate::infrastructure::traits::FileSystem;

/// A tree together with the records and levels it was built from.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    pub table: MutationTable,
    pub levels: Vec<String>,
    pub tree: MuTree,
}

impl LoadedTree {
    /// Every sample of the record file, including those the tree dropped.
    pub fn samples(&self) -> SampleSet {
        self.table.samples()
    }

    /// Requested levels that split no records anywhere in the tree.
    pub fn unused_levels(&self) -> Vec<&str> {
        let used = self.tree.levels();
        self.levels
            .iter()
            .filter(|level| !used.contains(level.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Service for building mutation trees and querying mutation types.
pub struct ExploreService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
    registry: LevelRegistry,
}

impl ExploreService {
    /// Create a service with the built-in derived levels.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        let registry = LevelRegistry::with_bandwidth(settings.cluster_bandwidth);
        Self::with_registry(fs, settings, registry)
    }

    /// Create a service with a custom level registry.
    pub fn with_registry(fs: Arc<dyn FileSystem>, settings: Arc<Settings>, registry: LevelRegistry) -> Self {
        Self { fs, settings, registry }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &LevelRegistry {
        &self.registry
    }

    /// Read a JSON or tab-separated record file.
    #[instrument(level = "debug", skip(self))]
    pub fn load_table(&self, path: &Path) -> ApplicationResult<MutationTable> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("read records: {}", path.display()),
                source: "not a file".into(),
            });
        }
        let content = self.fs.read_to_string(path).with_path_context("read records", path)?;
        let rows = RecordFormat::from_path(path).parse(&content, path)?;
        let table = MutationTable::from_rows(rows, &self.settings.sample_field)?;
        debug!(records = table.len(), columns = ?table.columns(), "loaded records");
        Ok(table)
    }

    /// Build a tree from a record file over `levels` (default: configured levels).
    #[instrument(level = "debug", skip(self))]
    pub fn build(&self, path: &Path, levels: Option<&[String]>) -> ApplicationResult<LoadedTree> {
        let levels = levels.map(<[String]>::to_vec).unwrap_or_else(|| self.settings.levels.clone());
        let table = self.load_table(path)?;
        let tree = MuTree::build(&table, levels.as_slice(), &self.registry)?;
        info!(samples = tree.len(), levels = ?tree.levels(), "built tree from {}", path.display());
        Ok(LoadedTree { table, levels, tree })
    }

    /// Parse a mutation type given as a JSON set key.
    pub fn parse_type(&self, json: &str) -> ApplicationResult<MuType> {
        let key: SetKey = serde_json::from_str(json).map_err(|e| ApplicationError::Parse {
            what: "mutation type".to_string(),
            message: e.to_string(),
        })?;
        Ok(MuType::from_key(&key)?)
    }

    /// Samples carrying `mtype` (default: any mutation in the tree).
    pub fn samples(&self, loaded: &LoadedTree, mtype: Option<&MuType>) -> ApplicationResult<SampleSet> {
        let samples = match mtype {
            Some(mtype) => mtype.samples_of(&loaded.tree)?,
            None => loaded.tree.samples(),
        };
        Ok(samples)
    }

    /// Mutation status of every sample in the record file.
    pub fn status(&self, loaded: &LoadedTree, mtype: Option<&MuType>) -> ApplicationResult<Vec<(String, bool)>> {
        let samples: Vec<String> = loaded.samples().into_iter().collect();
        let status = loaded.tree.status(samples.as_slice(), mtype)?;
        Ok(samples.into_iter().zip(status).collect())
    }

    pub fn overlap(&self, loaded: &LoadedTree, first: &MuType, second: &MuType) -> ApplicationResult<f64> {
        Ok(loaded.tree.overlap(first, second)?)
    }

    pub fn subtypes(
        &self,
        loaded: &LoadedTree,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: Option<usize>,
    ) -> ApplicationResult<BTreeSet<MuType>> {
        let min_size = min_size.unwrap_or(self.settings.min_size);
        Ok(loaded.tree.subtypes(mtype, levels, min_size)?)
    }

    pub fn combinations(
        &self,
        loaded: &LoadedTree,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: Option<usize>,
        sizes: Option<&[usize]>,
    ) -> ApplicationResult<BTreeSet<MuType>> {
        let min_size = min_size.unwrap_or(self.settings.min_size);
        let sizes = sizes.unwrap_or(&self.settings.comb_sizes);
        Ok(loaded.tree.combinations(mtype, levels, min_size, sizes)?)
    }

    pub fn all_combinations(
        &self,
        loaded: &LoadedTree,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: Option<usize>,
    ) -> ApplicationResult<BTreeSet<MuType>> {
        let min_size = min_size.unwrap_or(self.settings.min_size);
        Ok(loaded.tree.all_combinations(mtype, levels, min_size)?)
    }
}
