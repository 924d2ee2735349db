//! Mutation trees: samples organized by mutation annotation levels.
//!
//! Each level of a [`MuTree`] corresponds to an annotation level such as
//! `Gene`, `Form` or `Protein`; each branch to a value of that level present
//! in at least one sample. A branch ends either in a further node or in a
//! leaf holding the samples that carry the whole path of values.
//!
//! ```text
//! Gene IS TP53 AND
//!     Exon IS 3 AND
//!         Protein IS H3R: S1
//!         Protein IS S7T: S2
//!     Exon IS 7: S4
//! Gene IS KRAS: S3
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::levels::LevelRegistry;
use crate::domain::mutype::{MuType, SetKey};
use crate::domain::record::{MutationTable, SampleSet};

/// A tree position: either a node splitting on a level or a leaf of samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuTree {
    Node(MuNode),
    Leaf(SampleSet),
}

/// Internal node of a mutation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuNode {
    level: String,
    depth: usize,
    children: BTreeMap<String, MuTree>,
}

impl MuTree {
    /// Builds the tree of `table` over the ordered `levels`.
    ///
    /// Levels with no value for the records at hand are skipped. If no level
    /// splits the table at all the result is a bare leaf.
    #[instrument(level = "debug", skip(table, registry), fields(records = table.len()))]
    pub fn build<S: AsRef<str> + fmt::Debug>(
        table: &MutationTable,
        levels: &[S],
        registry: &LevelRegistry,
    ) -> DomainResult<Self> {
        if table.is_empty() {
            return Err(DomainError::MalformedInput(
                "cannot build a mutation tree from an empty table".to_string(),
            ));
        }
        let levels: Vec<String> = levels.iter().map(|l| l.as_ref().to_string()).collect();
        for level in &levels {
            registry.validate(table, level)?;
        }

        let tree = Self::grow(table, &levels, 0, registry)?;
        debug!(levels = ?tree.levels(), samples = tree.len(), "built mutation tree");
        Ok(tree)
    }

    fn grow(table: &MutationTable, levels: &[String], depth: usize, registry: &LevelRegistry) -> DomainResult<Self> {
        for (i, level) in levels.iter().enumerate() {
            if !registry.has_values(table, level)? {
                trace!(level, depth, "no values, skipping level");
                continue;
            }
            let groups = registry.split(table, level)?;
            if groups.is_empty() {
                continue;
            }

            let rest = &levels[i + 1..];
            let children = groups
                .into_iter()
                .map(|(branch, group)| Ok((branch, Self::grow(&group, rest, depth + 1, registry)?)))
                .collect::<DomainResult<BTreeMap<_, _>>>()?;
            return Ok(MuTree::Node(MuNode {
                level: level.clone(),
                depth,
                children,
            }));
        }
        Ok(MuTree::Leaf(table.samples()))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MuTree::Leaf(_))
    }

    pub fn as_node(&self) -> Option<&MuNode> {
        match self {
            MuTree::Node(node) => Some(node),
            MuTree::Leaf(_) => None,
        }
    }

    /// The level this position splits on; leaves have none.
    pub fn level(&self) -> Option<&str> {
        self.as_node().map(MuNode::level)
    }

    /// Every sample contained in this tree.
    pub fn samples(&self) -> SampleSet {
        match self {
            MuTree::Node(node) => node.samples(),
            MuTree::Leaf(samples) => samples.clone(),
        }
    }

    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        match self {
            MuTree::Node(node) => node.samples().len(),
            MuTree::Leaf(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MuTree::Node(node) => node.children.values().all(MuTree::is_empty),
            MuTree::Leaf(samples) => samples.is_empty(),
        }
    }

    /// Every level present in this tree and its children.
    pub fn levels(&self) -> BTreeSet<String> {
        self.as_node().map(MuNode::levels).unwrap_or_default()
    }

    /// For each of `samples`, the number of branches of the tree it ends up
    /// in. A sample with several mutations can occur in several branches.
    pub fn sample_counts<S: AsRef<str>>(&self, samples: &[S]) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> =
            samples.iter().map(|s| (s.as_ref().to_string(), 0)).collect();
        self.count_into(&mut counts);
        counts
    }

    fn count_into(&self, counts: &mut BTreeMap<String, usize>) {
        match self {
            MuTree::Node(node) => node.children.values().for_each(|c| c.count_into(counts)),
            MuTree::Leaf(samples) => {
                for sample in samples {
                    if let Some(count) = counts.get_mut(sample) {
                        *count += 1;
                    }
                }
            }
        }
    }

    /// Proportion of shared samples between two types, taking the larger of
    /// the two possible ratios; `0.0` if either type has no samples.
    pub fn overlap(&self, first: &MuType, second: &MuType) -> DomainResult<f64> {
        let samples1 = first.samples_of(self)?;
        let samples2 = second.samples_of(self)?;
        if samples1.is_empty() || samples2.is_empty() {
            return Ok(0.0);
        }
        let shared = samples1.intersection(&samples2).count() as f64;
        Ok((shared / samples1.len() as f64).max(shared / samples2.len() as f64))
    }

    /// The type containing every branch of the tree, descending through the
    /// given levels (default: all of them).
    pub fn all_type(&self, levels: Option<&BTreeSet<String>>) -> DomainResult<MuType> {
        match self {
            MuTree::Node(node) => match levels {
                Some(levels) => node.all_type(levels),
                None => node.all_type(&node.levels()),
            },
            MuTree::Leaf(_) => Ok(MuType::empty()),
        }
    }

    /// The set key of [`MuTree::all_type`].
    pub fn all_key(&self, levels: Option<&BTreeSet<String>>) -> DomainResult<SetKey> {
        Ok(self.all_type(levels)?.to_key())
    }

    /// For each of `samples`, whether it carries a mutation of `mtype`
    /// (default: any mutation in the tree).
    pub fn status<S: AsRef<str>>(&self, samples: &[S], mtype: Option<&MuType>) -> DomainResult<Vec<bool>> {
        let found = match mtype {
            Some(mtype) => mtype.samples_of(self)?,
            None => self.all_type(None)?.samples_of(self)?,
        };
        Ok(samples.iter().map(|s| found.contains(s.as_ref())).collect())
    }

    /// The subtree or leaf reached by following `path` from this position.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> DomainResult<&MuTree> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(self);
        };
        match self {
            MuTree::Leaf(_) => Err(DomainError::KeyDepthOverflow {
                requested: path.len(),
                available: 0,
            }),
            MuTree::Node(node) => {
                let child = node.branch(first.as_ref()).ok_or_else(|| DomainError::BranchNotFound {
                    level: node.level.clone(),
                    branch: first.as_ref().to_string(),
                })?;
                child.get(rest).map_err(|e| match e {
                    DomainError::KeyDepthOverflow { requested, available } => DomainError::KeyDepthOverflow {
                        requested: requested + 1,
                        available: available + 1,
                    },
                    other => other,
                })
            }
        }
    }

    /// Keeps only `samples` in the tree, dropping branches left empty.
    ///
    /// Takes `&mut self`, so no reader can observe the tree while it is
    /// rewritten. Restricting twice to the same samples changes nothing.
    pub fn restrict(&mut self, samples: &SampleSet) {
        match self {
            MuTree::Node(node) => node.restrict(samples),
            MuTree::Leaf(leaf) => leaf.retain(|s| samples.contains(s)),
        }
    }

    /// Copy of the tree restricted to `samples`.
    pub fn restricted(&self, samples: &SampleSet) -> MuTree {
        let mut tree = self.clone();
        tree.restrict(samples);
        tree
    }
}

impl MuNode {
    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn children(&self) -> &BTreeMap<String, MuTree> {
        &self.children
    }

    pub fn branch(&self, value: &str) -> Option<&MuTree> {
        self.children.get(value)
    }

    pub fn samples(&self) -> SampleSet {
        let mut samples = SampleSet::new();
        for child in self.children.values() {
            match child {
                MuTree::Node(node) => samples.extend(node.samples()),
                MuTree::Leaf(leaf) => samples.extend(leaf.iter().cloned()),
            }
        }
        samples
    }

    pub fn levels(&self) -> BTreeSet<String> {
        let mut levels = BTreeSet::from([self.level.clone()]);
        for child in self.children.values() {
            if let MuTree::Node(node) = child {
                levels.extend(node.levels());
            }
        }
        levels
    }

    pub(crate) fn all_type(&self, levels: &BTreeSet<String>) -> DomainResult<MuType> {
        let mut remaining = levels.clone();
        remaining.remove(&self.level);

        let below = |branch: &MuTree| -> DomainResult<Option<MuType>> {
            match branch {
                MuTree::Node(child) if !remaining.is_empty() => {
                    let nested = child.all_type(&remaining)?;
                    Ok((!nested.is_empty()).then_some(nested))
                }
                _ => Ok(None),
            }
        };

        if levels.contains(&self.level) {
            let mut key = SetKey::new();
            for (value, branch) in &self.children {
                key = key.with(self.level.clone(), [value.clone()], below(branch)?.map(|t| t.to_key()));
            }
            return MuType::from_key(&key);
        }

        // this level is not wanted: merge the keys found below each branch
        let mut merged = MuType::empty();
        for branch in self.children.values() {
            if let Some(nested) = below(branch)? {
                merged = merged.union(&nested)?;
            }
        }
        Ok(merged)
    }

    fn restrict(&mut self, samples: &SampleSet) {
        self.children.retain(|_, child| {
            child.restrict(samples);
            !child.is_empty()
        });
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "\t".repeat(self.depth);
        for (value, branch) in &self.children {
            write!(f, "{}{} IS {}", indent, self.level, value)?;
            match branch {
                MuTree::Node(child) => {
                    writeln!(f, " AND")?;
                    child.fmt_indented(f)?;
                }
                MuTree::Leaf(samples) if samples.len() > 8 => {
                    writeln!(f, ": ({} samples)", samples.len())?
                }
                MuTree::Leaf(samples) => {
                    writeln!(f, ": {}", samples.iter().cloned().collect::<Vec<_>>().join(","))?
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for MuTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuTree::Node(node) => node.fmt_indented(f),
            MuTree::Leaf(samples) => {
                writeln!(f, "{}", samples.iter().cloned().collect::<Vec<_>>().join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;

    fn small_tree() -> MuTree {
        let table = MutationTable::new(vec![
            Record::new("S1").with("Gene", "TP53").with("Form", "Missense"),
            Record::new("S2").with("Gene", "TP53").with("Form", "Missense"),
            Record::new("S3").with("Gene", "KRAS").with("Form", "Nonsense"),
        ]);
        MuTree::build(&table, &["Gene", "Form"], &LevelRegistry::default()).unwrap()
    }

    #[test]
    fn given_tree_when_displaying_then_lists_branches_by_depth() {
        let expected = "Gene IS KRAS AND\n\tForm IS Nonsense: S3\nGene IS TP53 AND\n\tForm IS Missense: S1,S2\n";
        assert_eq!(small_tree().to_string(), expected);
    }

    #[test]
    fn given_path_when_getting_then_follows_branches() {
        let tree = small_tree();
        let leaf = tree.get(&["TP53", "Missense"]).unwrap();
        assert_eq!(leaf, &MuTree::Leaf(SampleSet::from(["S1".to_string(), "S2".to_string()])));
        assert_eq!(tree.get::<&str>(&[]).unwrap(), &tree);
    }

    #[test]
    fn given_too_long_path_when_getting_then_overflows() {
        let err = small_tree().get(&["TP53", "Missense", "R175H"]).unwrap_err();
        assert_eq!(
            err,
            DomainError::KeyDepthOverflow {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn given_unknown_branch_when_getting_then_reports_level() {
        let err = small_tree().get(&["BRAF"]).unwrap_err();
        assert!(matches!(err, DomainError::BranchNotFound { ref level, .. } if level == "Gene"));
    }
}
