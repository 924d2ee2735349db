//! Discovery of mutation types supported by a tree.
//!
//! Sibling branches are independent, so each level is searched in parallel;
//! results are sets and do not depend on the order branches finish in.

use std::collections::BTreeSet;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::mutype::MuType;
use crate::domain::tree::{MuNode, MuTree};

/// A branch of a node together with the constraint a type puts on it.
type Matched<'a> = (&'a str, &'a MuTree, Option<&'a MuType>);

fn merge_all(results: Vec<DomainResult<BTreeSet<MuType>>>) -> DomainResult<BTreeSet<MuType>> {
    let mut merged = BTreeSet::new();
    for result in results {
        merged.extend(result?);
    }
    Ok(merged)
}

impl MuTree {
    /// Every type made of one branch per level that is contained in `mtype`
    /// (default: the whole tree), stops at the given levels (default: all)
    /// and has at least `min_size` samples.
    #[instrument(level = "debug", skip(self, mtype))]
    pub fn subtypes(
        &self,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: usize,
    ) -> DomainResult<BTreeSet<MuType>> {
        let MuTree::Node(node) = self else {
            return Ok(BTreeSet::new());
        };
        let levels: BTreeSet<String> = match levels {
            Some(levels) => levels.iter().cloned().collect(),
            None => node.levels(),
        };
        let found = node.subtypes(mtype, &levels, min_size)?;
        debug!(found = found.len(), "enumerated subtypes");
        Ok(found)
    }

    /// Unions of `k` subtypes for every `k` in `sizes` with at least
    /// `min_size` samples.
    #[instrument(level = "debug", skip(self, mtype))]
    pub fn combinations(
        &self,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: usize,
        sizes: &[usize],
    ) -> DomainResult<BTreeSet<MuType>> {
        let MuTree::Node(node) = self else {
            return Ok(BTreeSet::new());
        };
        let levels: BTreeSet<String> = match levels {
            Some(levels) => levels.iter().cloned().collect(),
            None => node.levels(),
        };
        let found = node.combinations(mtype, &levels, min_size, sizes)?;
        debug!(found = found.len(), "enumerated combinations");
        Ok(found)
    }

    /// Types combining any number of sibling branches at each of the given
    /// levels, recursively per subtree.
    #[instrument(level = "debug", skip(self, mtype))]
    pub fn all_combinations(
        &self,
        mtype: Option<&MuType>,
        levels: Option<&[String]>,
        min_size: usize,
    ) -> DomainResult<BTreeSet<MuType>> {
        let MuTree::Node(node) = self else {
            return Ok(BTreeSet::new());
        };
        let levels: Vec<String> = match levels {
            Some(levels) => levels.to_vec(),
            None => node.ordered_levels(),
        };
        let found = node.all_combinations(mtype, &levels, min_size)?;
        debug!(found = found.len(), "enumerated combinations of any size");
        Ok(found)
    }
}

impl MuNode {
    /// The branches of this node that `mtype` names, with their constraint.
    fn matching<'a>(&'a self, mtype: &'a MuType) -> Vec<Matched<'a>> {
        if mtype.level() != Some(self.level()) {
            return Vec::new();
        }
        mtype
            .iter()
            .filter_map(|(value, nested)| {
                self.children()
                    .get_key_value(value)
                    .map(|(value, branch)| (value.as_str(), branch, nested))
            })
            .collect()
    }

    /// Levels of this node and below, outermost first.
    fn ordered_levels(&self) -> Vec<String> {
        let mut levels = vec![self.level().to_string()];
        for child in self.children().values() {
            if let MuTree::Node(child) = child {
                for level in child.ordered_levels() {
                    if !levels.contains(&level) {
                        levels.push(level);
                    }
                }
            }
        }
        levels
    }

    /// Branches named by `mtype`, or every branch unconstrained when no type
    /// restricts the search.
    fn branches<'a>(&'a self, mtype: Option<&'a MuType>) -> Vec<Matched<'a>> {
        match mtype {
            Some(mtype) => self.matching(mtype),
            None => self
                .children()
                .iter()
                .map(|(value, branch)| (value.as_str(), branch, None))
                .collect(),
        }
    }

    pub(crate) fn subtypes(
        &self,
        mtype: Option<&MuType>,
        levels: &BTreeSet<String>,
        min_size: usize,
    ) -> DomainResult<BTreeSet<MuType>> {
        let matched = self.branches(mtype);

        if levels.contains(self.level()) {
            let results: Vec<DomainResult<BTreeSet<MuType>>> = matched
                .par_iter()
                .filter(|(_, branch, _)| branch.len() >= min_size)
                .map(|&(value, branch, nested)| {
                    let mut found = BTreeSet::new();
                    match nested {
                        None => {
                            found.insert(MuType::single(self.level(), value, None));
                        }
                        // a constrained branch is only as wide as its constraint
                        Some(nested) => {
                            let narrowed = MuType::single(self.level(), value, Some(nested.clone()));
                            if narrowed.samples_in(self).len() >= min_size {
                                found.insert(narrowed);
                            }
                        }
                    }
                    if let MuTree::Node(child) = branch {
                        if !child.levels().is_disjoint(levels) {
                            for sub in child.subtypes(nested, levels, min_size)? {
                                found.insert(MuType::single(self.level(), value, Some(sub)));
                            }
                        }
                    }
                    Ok(found)
                })
                .collect();
            return merge_all(results);
        }

        // this level is not wanted: search below, then check sizes here
        let results: Vec<DomainResult<BTreeSet<MuType>>> = matched
            .par_iter()
            .filter_map(|&(_, branch, nested)| match branch {
                MuTree::Node(child) if !child.levels().is_disjoint(levels) => {
                    Some(child.subtypes(nested, levels, 1))
                }
                _ => None,
            })
            .collect();
        let below = merge_all(results)?;
        Ok(below
            .into_iter()
            .filter(|t| t.samples_in(self).len() >= min_size)
            .collect())
    }

    pub(crate) fn combinations(
        &self,
        mtype: Option<&MuType>,
        levels: &BTreeSet<String>,
        min_size: usize,
        sizes: &[usize],
    ) -> DomainResult<BTreeSet<MuType>> {
        let subtypes: Vec<MuType> = self.subtypes(mtype, levels, 1)?.into_iter().collect();
        trace!(subtypes = subtypes.len(), ?sizes, "combining subtypes");

        let mut found = BTreeSet::new();
        for &size in sizes.iter().filter(|&&k| k > 0) {
            let combos: Vec<Vec<&MuType>> = subtypes.iter().combinations(size).collect();
            let results: Vec<DomainResult<Option<MuType>>> = combos
                .par_iter()
                .map(|combo| {
                    let union = combo[1..]
                        .iter()
                        .try_fold(combo[0].clone(), |acc, t| acc.union(t));
                    match union {
                        Ok(union) => Ok((union.samples_in(self).len() >= min_size).then_some(union)),
                        // subtypes found at different levels cannot be combined
                        Err(DomainError::LevelMismatch { .. }) => Ok(None),
                        Err(e) => Err(e),
                    }
                })
                .collect();
            for result in results {
                found.extend(result?);
            }
        }
        Ok(found)
    }

    pub(crate) fn all_combinations(
        &self,
        mtype: Option<&MuType>,
        levels: &[String],
        min_size: usize,
    ) -> DomainResult<BTreeSet<MuType>> {
        let wanted: BTreeSet<String> = levels.iter().cloned().collect();
        let mut found = BTreeSet::new();

        let eligible: Vec<Matched<'_>> = self
            .branches(mtype)
            .into_iter()
            .filter(|(_, branch, _)| match branch {
                MuTree::Node(child) => branch.len() >= min_size && !child.levels().is_disjoint(&wanted),
                MuTree::Leaf(_) => false,
            })
            .collect();

        if wanted.contains(self.level()) {
            let n = self.children().len();
            if n > 1 || (n == 1 && levels.first().map(String::as_str) == Some(self.level())) {
                let this_level = BTreeSet::from([self.level().to_string()]);
                let sizes: Vec<usize> = (1..=n).collect();
                found.extend(self.combinations(mtype, &this_level, min_size, &sizes)?);
            }

            let results: Vec<DomainResult<BTreeSet<MuType>>> = eligible
                .par_iter()
                .map(|&(value, branch, nested)| {
                    let MuTree::Node(child) = branch else {
                        return Ok(BTreeSet::new());
                    };
                    Ok(child
                        .all_combinations(nested, levels, min_size)?
                        .into_iter()
                        .map(|sub| MuType::single(self.level(), value, Some(sub)))
                        .collect())
                })
                .collect();
            found.extend(merge_all(results)?);
        } else {
            let results: Vec<DomainResult<BTreeSet<MuType>>> = eligible
                .par_iter()
                .map(|&(_, branch, nested)| match branch {
                    MuTree::Node(child) => child.all_combinations(nested, levels, min_size),
                    MuTree::Leaf(_) => Ok(BTreeSet::new()),
                })
                .collect();
            found.extend(merge_all(results)?);
        }

        Ok(found)
    }
}
