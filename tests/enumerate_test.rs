//! Tests for subtype and combination enumeration

use std::collections::BTreeSet;

use rstest::{fixture, rstest};

use mutree::domain::{LevelRegistry, MuTree, MuType};
use mutree::util::testing::{self, gene_form_table, table};

fn gene(values: &[&str]) -> MuType {
    values
        .iter()
        .map(|v| MuType::single("Gene", *v, None))
        .try_fold(MuType::empty(), |acc, t| acc.union(&t))
        .unwrap()
}

fn gene_form(g: &str, form: &str) -> MuType {
    MuType::single("Gene", g, Some(MuType::single("Form", form, None)))
}

fn levels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[fixture]
fn gene_form_tree() -> MuTree {
    testing::init_test_setup();
    MuTree::build(&gene_form_table(), &["Gene", "Form"], &LevelRegistry::default()).unwrap()
}

/// TP53: Missense in S1, S2, S3 and Nonsense in S4; KRAS: Missense in S5;
/// BRAF: Missense in S6, S7.
#[fixture]
fn cohort_tree() -> MuTree {
    testing::init_test_setup();
    let table = table(&[
        ("S1", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S2", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S3", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S4", &[("Gene", "TP53"), ("Form", "Nonsense")]),
        ("S5", &[("Gene", "KRAS"), ("Form", "Missense")]),
        ("S6", &[("Gene", "BRAF"), ("Form", "Missense")]),
        ("S7", &[("Gene", "BRAF"), ("Form", "Missense")]),
    ]);
    MuTree::build(&table, &["Gene", "Form"], &LevelRegistry::default()).unwrap()
}

#[rstest]
fn given_gene_form_tree_when_enumerating_subtypes_then_lists_every_path_prefix(gene_form_tree: MuTree) {
    let found = gene_form_tree.subtypes(None, None, 1).unwrap();

    let expected = BTreeSet::from([
        gene(&["KRAS"]),
        gene(&["TP53"]),
        gene_form("KRAS", "Nonsense"),
        gene_form("TP53", "Missense"),
    ]);
    assert_eq!(found, expected);
}

#[rstest]
fn given_gene_level_only_when_enumerating_subtypes_then_stops_at_genes(gene_form_tree: MuTree) {
    let found = gene_form_tree.subtypes(None, Some(&levels(&["Gene"])), 1).unwrap();

    assert_eq!(found, BTreeSet::from([gene(&["KRAS"]), gene(&["TP53"])]));
}

#[rstest]
fn given_unrequested_root_level_when_enumerating_subtypes_then_returns_nested_forms(cohort_tree: MuTree) {
    let found = cohort_tree.subtypes(None, Some(&levels(&["Form"])), 3).unwrap();

    // Missense is carried by six samples across genes, Nonsense by one
    let missense = MuType::single("Form", "Missense", None);
    assert!(found.contains(&missense));
    assert!(found.iter().all(|t| t.level() == Some("Form")));
    assert!(!found.contains(&MuType::single("Form", "Nonsense", None)));
}

#[rstest]
fn given_min_size_when_enumerating_subtypes_then_drops_small_branches(cohort_tree: MuTree) {
    let found = cohort_tree.subtypes(None, None, 2).unwrap();

    assert!(found.contains(&gene(&["TP53"])));
    assert!(found.contains(&gene(&["BRAF"])));
    assert!(found.contains(&gene_form("TP53", "Missense")));
    assert!(!found.contains(&gene(&["KRAS"])));
    assert!(!found.contains(&gene_form("TP53", "Nonsense")));
}

#[rstest]
fn given_restricting_type_when_enumerating_subtypes_then_stays_within_it(cohort_tree: MuTree) {
    let tp53 = gene(&["TP53"]);

    let found = cohort_tree.subtypes(Some(&tp53), None, 1).unwrap();

    assert!(!found.is_empty());
    assert!(found.iter().all(|t| tp53.is_supertype(t)), "{found:?}");
}

#[test]
fn given_nested_restricting_type_when_enumerating_then_never_widens_it() {
    testing::init_test_setup();
    let table = table(&[
        ("S1", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S4", &[("Gene", "TP53"), ("Form", "Nonsense")]),
        ("S5", &[("Gene", "KRAS"), ("Form", "Missense")]),
    ]);
    let tree = MuTree::build(&table, &["Gene", "Form"], &LevelRegistry::default()).unwrap();
    let tp53_missense = gene_form("TP53", "Missense");

    let subtypes = tree.subtypes(Some(&tp53_missense), None, 1).unwrap();
    let combos = tree.combinations(Some(&tp53_missense), None, 1, &[1, 2]).unwrap();
    let tree_types = tree.all_combinations(Some(&tp53_missense), None, 1).unwrap();

    assert_eq!(subtypes, BTreeSet::from([tp53_missense.clone()]));
    assert!(!combos.contains(&gene(&["TP53"])));
    for t in subtypes.iter().chain(&combos).chain(&tree_types) {
        assert!(tp53_missense.is_supertype(t), "{t}");
        assert_eq!(t.samples_of(&tree).unwrap(), BTreeSet::from(["S1".to_string()]));
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn given_min_size_when_enumerating_then_every_type_is_large_enough(cohort_tree: MuTree, #[case] min_size: usize) {
    let subtypes = cohort_tree.subtypes(None, None, min_size).unwrap();
    let combos = cohort_tree.combinations(None, None, min_size, &[1, 2, 3]).unwrap();
    let tree_types = cohort_tree.all_combinations(None, None, min_size).unwrap();

    for t in subtypes.iter().chain(&combos).chain(&tree_types) {
        assert!(t.samples_of(&cohort_tree).unwrap().len() >= min_size, "{t}");
    }
}

#[rstest]
fn given_gene_pairs_when_combining_then_unions_two_genes(cohort_tree: MuTree) {
    let found = cohort_tree
        .combinations(None, Some(&levels(&["Gene"])), 1, &[2])
        .unwrap();

    let expected = BTreeSet::from([
        gene(&["BRAF", "KRAS"]),
        gene(&["BRAF", "TP53"]),
        gene(&["KRAS", "TP53"]),
    ]);
    assert_eq!(found, expected);
}

#[rstest]
fn given_zero_and_oversized_sizes_when_combining_then_ignores_them(gene_form_tree: MuTree) {
    let found = gene_form_tree
        .combinations(None, Some(&levels(&["Gene"])), 1, &[0, 5])
        .unwrap();

    assert!(found.is_empty());
}

#[rstest]
fn given_nested_subtypes_when_combining_then_unions_stay_at_root_level(cohort_tree: MuTree) {
    let found = cohort_tree.combinations(None, None, 1, &[2]).unwrap();

    assert!(found.contains(&(&gene(&["TP53"]) | &gene(&["KRAS"])).unwrap()));
    assert!(found.iter().all(|t| t.level() == Some("Gene")));
}

#[rstest]
fn given_tree_when_enumerating_all_combinations_then_combines_genes_of_any_size(cohort_tree: MuTree) {
    let found = cohort_tree.all_combinations(None, None, 1).unwrap();

    assert!(found.contains(&gene(&["TP53"])));
    assert!(found.contains(&gene(&["BRAF", "KRAS", "TP53"])));
    // TP53 has two forms, so they are combined below it
    let tp53_forms = MuType::single(
        "Gene",
        "TP53",
        Some((&MuType::single("Form", "Missense", None) | &MuType::single("Form", "Nonsense", None)).unwrap()),
    );
    assert!(found.contains(&tp53_forms));
    assert!(found.contains(&gene_form("TP53", "Nonsense")));
}

#[test]
fn given_leaf_when_enumerating_then_returns_nothing() {
    let table = table(&[("S1", &[("Gene", "TP53")])]);
    let leaf = MuTree::build(&table, &["Gene"], &LevelRegistry::default())
        .unwrap()
        .get(&["TP53"])
        .unwrap()
        .clone();

    assert!(leaf.subtypes(None, None, 1).unwrap().is_empty());
    assert!(leaf.combinations(None, None, 1, &[1, 2]).unwrap().is_empty());
    assert!(leaf.all_combinations(None, None, 1).unwrap().is_empty());
}
