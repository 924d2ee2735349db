//! Mutation types: an algebra over sets of mutation sub-types.
//!
//! A [`MuType`] names one annotation level and maps groups of category values
//! at that level to an optional nested type. `None` accepts any mutation below
//! the category, a nested type restricts it further. A type denotes the union
//! of its branches; it is evaluated against a [`MuTree`] to get samples.
//!
//! ```text
//! Gene IS TP53 AND Form IS Missense_Mutation OR Gene IS KRAS
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, Sub};

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::SampleSet;
use crate::domain::tree::{MuNode, MuTree};

/// One entry of a [`SetKey`]: categories of a level and their constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub level: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub sub: Option<SetKey>,
}

/// Literal description of a mutation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetKey {
    entries: Vec<KeyEntry>,
}

impl SetKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; `sub = None` accepts any mutation below `values`.
    pub fn with<I, S>(mut self, level: impl Into<String>, values: I, sub: Option<SetKey>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(KeyEntry {
            level: level.into(),
            values: values.into_iter().map(Into::into).collect(),
            sub,
        });
        self
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects `(category, constraint)` pairs of one level and partitions the
/// categories by constraint before the immutable type is allocated.
struct TypeBuilder {
    level: Option<String>,
    constraints: BTreeMap<String, Option<MuType>>,
}

impl TypeBuilder {
    fn new(level: Option<&str>) -> Self {
        Self {
            level: level.map(str::to_string),
            constraints: BTreeMap::new(),
        }
    }

    /// A category seen twice keeps the union of its constraints; accepting
    /// anything absorbs every narrower constraint.
    fn insert(&mut self, category: &str, nested: Option<MuType>) -> DomainResult<()> {
        let merged = match (self.constraints.remove(category), nested) {
            (None, nested) => nested,
            (Some(None), _) | (Some(Some(_)), None) => None,
            (Some(Some(old)), Some(new)) => Some(old.union(&new)?),
        };
        self.constraints.insert(category.to_string(), merged);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn build(self) -> MuType {
        if self.constraints.is_empty() {
            return MuType::empty();
        }
        let mut by_constraint: BTreeMap<Option<MuType>, BTreeSet<String>> = BTreeMap::new();
        for (category, nested) in self.constraints {
            by_constraint.entry(nested).or_default().insert(category);
        }
        let branches = by_constraint
            .into_iter()
            .map(|(nested, group)| (group, nested.map(Box::new)))
            .collect();
        MuType {
            level: self.level,
            branches,
        }
    }
}

/// A set of mutation sub-types defined through annotation levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuType {
    level: Option<String>,
    branches: BTreeMap<BTreeSet<String>, Option<Box<MuType>>>,
}

impl MuType {
    /// The type with no level and no branches.
    pub fn empty() -> Self {
        Self {
            level: None,
            branches: BTreeMap::new(),
        }
    }

    /// A type with a single category.
    pub fn single(level: impl Into<String>, category: impl Into<String>, nested: Option<MuType>) -> Self {
        let nested = nested.filter(|n| !n.is_empty());
        Self {
            level: Some(level.into()),
            branches: BTreeMap::from([(BTreeSet::from([category.into()]), nested.map(Box::new))]),
        }
    }

    /// Builds a type from its literal description.
    pub fn from_key(key: &SetKey) -> DomainResult<Self> {
        let levels: BTreeSet<&str> = key.entries.iter().map(|e| e.level.as_str()).collect();
        if levels.len() > 1 {
            return Err(DomainError::MalformedInput(format!(
                "set key names several mutation levels: {:?}",
                levels
            )));
        }
        let mut builder = TypeBuilder::new(levels.into_iter().next());

        for entry in &key.entries {
            if entry.values.is_empty() {
                return Err(DomainError::MalformedInput(format!(
                    "set key entry for level {} has no values",
                    entry.level
                )));
            }
            let nested = match &entry.sub {
                Some(sub) if sub.is_empty() => {
                    return Err(DomainError::MalformedInput(format!(
                        "set key entry for level {} has an empty nested key",
                        entry.level
                    )))
                }
                Some(sub) => Some(MuType::from_key(sub)?),
                None => None,
            };
            for value in &entry.values {
                builder.insert(value, nested.clone())?;
            }
        }

        Ok(builder.build())
    }

    /// The literal description of this type, one entry per branch group.
    pub fn to_key(&self) -> SetKey {
        let Some(level) = &self.level else {
            return SetKey::new();
        };
        self.branches
            .iter()
            .fold(SetKey::new(), |key, (group, nested)| {
                key.with(level.clone(), group.iter().cloned(), nested.as_ref().map(|n| n.to_key()))
            })
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Number of categories at this level.
    pub fn len(&self) -> usize {
        self.branches.keys().map(BTreeSet::len).sum()
    }

    /// Branch groups: categories sharing an identical constraint.
    pub fn groups(&self) -> impl Iterator<Item = (&BTreeSet<String>, Option<&MuType>)> {
        self.branches.iter().map(|(g, n)| (g, n.as_deref()))
    }

    /// Expanded `(category, constraint)` pairs, sorted by category.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&MuType>)> {
        self.expanded().into_iter()
    }

    fn expanded(&self) -> BTreeMap<&str, Option<&MuType>> {
        self.branches
            .iter()
            .flat_map(|(group, nested)| group.iter().map(move |c| (c.as_str(), nested.as_deref())))
            .collect()
    }

    /// Constraint of `category`: `None` if absent, `Some(None)` if any
    /// mutation below it is accepted.
    pub fn get(&self, category: &str) -> Option<Option<&MuType>> {
        self.branches
            .iter()
            .find(|(group, _)| group.contains(category))
            .map(|(_, nested)| nested.as_deref())
    }

    /// All levels named by this type and its nested types.
    pub fn levels(&self) -> BTreeSet<String> {
        let mut levels: BTreeSet<String> = self.level.iter().cloned().collect();
        for nested in self.branches.values().flatten() {
            levels.extend(nested.levels());
        }
        levels
    }

    fn check_level(&self, other: &MuType) -> DomainResult<()> {
        if self.level != other.level {
            return Err(DomainError::level_mismatch(self.level(), other.level()));
        }
        Ok(())
    }

    /// Union: categories on either side, constraints merged where both have
    /// the category.
    pub fn union(&self, other: &MuType) -> DomainResult<MuType> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        self.check_level(other)?;

        let mut builder = TypeBuilder::new(self.level());
        for (category, nested) in self.iter().chain(other.iter()) {
            builder.insert(category, nested.cloned())?;
        }
        Ok(builder.build())
    }

    /// Intersection: categories on both sides whose constraints still
    /// overlap.
    pub fn intersection(&self, other: &MuType) -> DomainResult<MuType> {
        if self.is_empty() || other.is_empty() {
            return Ok(MuType::empty());
        }
        self.check_level(other)?;

        let theirs = other.expanded();
        let mut builder = TypeBuilder::new(self.level());
        for (category, mine) in self.iter() {
            let Some(&their) = theirs.get(category) else {
                continue;
            };
            match (mine, their) {
                (None, nested) | (nested, None) => builder.insert(category, nested.cloned())?,
                (Some(mine), Some(their)) => {
                    let common = mine.intersection(their)?;
                    if !common.is_empty() {
                        builder.insert(category, Some(common))?;
                    }
                }
            }
        }
        Ok(builder.build())
    }

    /// Difference. Returns `None` ("no value") when every category of this
    /// type is cancelled by `other`.
    ///
    /// A category present in `other` is cancelled unless both sides carry a
    /// nested constraint, in which case the nested difference is kept. A
    /// category accepting any mutation has no narrower remainder, so a
    /// constrained category in `other` cancels it as well.
    pub fn difference(&self, other: &MuType) -> DomainResult<Option<MuType>> {
        if self.is_empty() {
            return Ok(None);
        }
        if other.is_empty() {
            return Ok(Some(self.clone()));
        }
        self.check_level(other)?;

        let theirs = other.expanded();
        let mut builder = TypeBuilder::new(self.level());
        for (category, mine) in self.iter() {
            match (mine, theirs.get(category).copied()) {
                (mine, None) => builder.insert(category, mine.cloned())?,
                (_, Some(None)) | (None, Some(Some(_))) => {}
                (Some(mine), Some(Some(their))) => {
                    if let Some(rest) = mine.difference(their)? {
                        builder.insert(category, Some(rest))?;
                    }
                }
            }
        }

        if builder.is_empty() {
            Ok(None)
        } else {
            Ok(Some(builder.build()))
        }
    }

    /// Whether every mutation in `other` is also in this type.
    pub fn is_supertype(&self, other: &MuType) -> bool {
        if self.level != other.level {
            return false;
        }
        let mine = self.expanded();
        other.iter().all(|(category, their)| match mine.get(category) {
            None => false,
            Some(None) => true,
            Some(Some(mine)) => their.is_some_and(|their| mine.is_supertype(their)),
        })
    }

    /// Samples of `tree` carrying a mutation of this type.
    ///
    /// A bare leaf has no level to match, so no sample of it is typed.
    pub fn samples_of(&self, tree: &MuTree) -> DomainResult<SampleSet> {
        match tree {
            MuTree::Node(node) => Ok(self.samples_in(node)),
            MuTree::Leaf(_) => Ok(SampleSet::new()),
        }
    }

    pub(crate) fn samples_in(&self, node: &MuNode) -> SampleSet {
        let mut samples = SampleSet::new();

        if self.level() == Some(node.level()) {
            for (category, nested) in self.iter() {
                match (node.branch(category), nested) {
                    (None, _) => {}
                    (Some(MuTree::Leaf(leaf)), _) => samples.extend(leaf.iter().cloned()),
                    (Some(branch @ MuTree::Node(_)), None) => samples.extend(branch.samples()),
                    (Some(MuTree::Node(child)), Some(nested)) => {
                        samples.extend(nested.samples_in(child))
                    }
                }
            }
        } else {
            // the tree skipped this type's level for some branches
            let levels = self.levels();
            for child in node.children().values() {
                if let MuTree::Node(child) = child {
                    if !child.levels().is_disjoint(&levels) {
                        samples.extend(self.samples_in(child));
                    }
                }
            }
        }

        samples
    }

    /// The branches of `tree` at this type's level that are not covered by
    /// this type.
    pub fn invert(&self, tree: &MuTree) -> DomainResult<MuType> {
        match tree {
            MuTree::Node(node) => self.invert_node(node),
            MuTree::Leaf(_) => Err(DomainError::TypeMismatch(
                "cannot invert against a leaf, which is not a mutation tree".to_string(),
            )),
        }
    }

    fn invert_node(&self, node: &MuNode) -> DomainResult<MuType> {
        if !self.is_empty() && self.level() != Some(node.level()) {
            return Err(DomainError::level_mismatch(self.level(), Some(node.level())));
        }

        let mut builder = TypeBuilder::new(Some(node.level()));
        for (category, branch) in node.children() {
            match (self.get(category), branch) {
                (None, _) => builder.insert(category, None)?,
                (Some(Some(nested)), MuTree::Node(child)) if nested.level() == Some(child.level()) => {
                    let rest = nested.invert_node(child)?;
                    if !rest.is_empty() {
                        builder.insert(category, Some(rest))?;
                    }
                }
                _ => {}
            }
        }
        Ok(builder.build())
    }

    /// Decomposes this type into types holding exactly one category per
    /// level.
    pub fn subkeys(&self) -> Vec<MuType> {
        let Some(level) = self.level() else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        for (category, nested) in self.iter() {
            match nested {
                None => keys.push(MuType::single(level, category, None)),
                Some(nested) => keys.extend(
                    nested
                        .subkeys()
                        .into_iter()
                        .map(|sub| MuType::single(level, category, Some(sub))),
                ),
            }
        }
        keys
    }

    /// Condensed label, e.g. `TP53-Missense_Mutation, KRAS`.
    pub fn label(&self) -> String {
        self.iter()
            .map(|(category, nested)| match nested {
                None => category.to_string(),
                Some(nested) => format!("{}-{}", category, nested.label()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.level().unwrap_or("none");
        let parts: Vec<String> = self
            .iter()
            .map(|(category, nested)| match nested {
                None => format!("{} IS {}", level, category),
                Some(nested) => format!("{} IS {} AND {}", level, category, nested),
            })
            .collect();
        write!(f, "{}", parts.join(" OR "))
    }
}

impl Hash for MuType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.len().hash(state);
        for (category, nested) in self.iter() {
            category.hash(state);
            nested.hash(state);
        }
    }
}

impl PartialOrd for MuType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MuType {
    fn cmp(&self, other: &Self) -> Ordering {
        // levels first, then how many categories each type holds
        match self.level.cmp(&other.level) {
            Ordering::Equal => {}
            ordering => return ordering,
        }
        match self.len().cmp(&other.len()) {
            Ordering::Equal => {}
            ordering => return ordering,
        }

        let mine = self.expanded();
        let theirs = other.expanded();
        if !mine.keys().eq(theirs.keys()) {
            return mine.keys().cmp(theirs.keys());
        }

        // same categories: the first differing constraint decides, with
        // "any mutation" sorting before a concrete constraint
        for (v, w) in mine.values().zip(theirs.values()) {
            let ordering = match (v, w) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(v), Some(w)) => v.cmp(w),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl BitOr for &MuType {
    type Output = DomainResult<MuType>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitAnd for &MuType {
    type Output = DomainResult<MuType>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl Sub for &MuType {
    type Output = DomainResult<Option<MuType>>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}
