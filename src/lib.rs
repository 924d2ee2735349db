//! Classification of samples by their mutations.
//!
//! A [`MuTree`](domain::MuTree) splits mutation records by an ordered list of
//! annotation levels; a [`MuType`](domain::MuType) names a set of branches of
//! such a tree and supports set algebra, sample lookup and enumeration.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
