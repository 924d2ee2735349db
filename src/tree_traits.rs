//! Conversion of mutation trees into `termtree` renderings.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{MuNode, MuTree};

/// Leaves with more samples than this are shown as a count.
const MAX_LISTED_SAMPLES: usize = 8;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for MuTree {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        match self {
            MuTree::Node(node) => {
                let root = format!("{} ({} samples)", node.level(), node.samples().len());
                Tree::new(root).with_leaves(branch_leaves(node))
            }
            MuTree::Leaf(samples) => Tree::new(format!("{} samples", samples.len())),
        }
    }
}

fn branch_leaves(node: &MuNode) -> Vec<Tree<String>> {
    node.children()
        .iter()
        .map(|(value, branch)| match branch {
            MuTree::Node(child) => {
                let label = format!("{} IS {} → {}", node.level(), value, child.level());
                Tree::new(label).with_leaves(branch_leaves(child))
            }
            MuTree::Leaf(samples) if samples.len() > MAX_LISTED_SAMPLES => {
                Tree::new(format!("{} IS {}: ({} samples)", node.level(), value, samples.len()))
            }
            MuTree::Leaf(samples) => {
                let listed = samples.iter().cloned().collect::<Vec<_>>().join(",");
                Tree::new(format!("{} IS {}: {}", node.level(), value, listed))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LevelRegistry, MutationTable, Record};

    #[test]
    fn given_tree_when_rendering_then_shows_every_branch() {
        let table = MutationTable::new(vec![
            Record::new("S1").with("Gene", "TP53").with("Form", "Missense"),
            Record::new("S2").with("Gene", "KRAS").with("Form", "Nonsense"),
        ]);
        let tree = MuTree::build(&table, &["Gene", "Form"], &LevelRegistry::default()).unwrap();

        let rendered = tree.to_tree_string().to_string();

        assert!(rendered.starts_with("Gene (2 samples)"));
        assert!(rendered.contains("Gene IS TP53 → Form"));
        assert!(rendered.contains("Form IS Missense: S1"));
        assert!(rendered.contains("Form IS Nonsense: S2"));
    }
}
