//! Shared setup for unit and integration tests.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{MutationTable, Record};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let noisy_modules = ["rayon", "rayon_core"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Table from `(sample, [(field, value)])` rows.
pub fn table(rows: &[(&str, &[(&str, &str)])]) -> MutationTable {
    MutationTable::new(
        rows.iter()
            .map(|(sample, fields)| {
                fields
                    .iter()
                    .fold(Record::new(*sample), |record, (field, value)| record.with(*field, *value))
            })
            .collect(),
    )
}

/// Gene/Form table used across tests:
/// TP53 Missense in S1, S2; KRAS Nonsense in S3.
pub fn gene_form_table() -> MutationTable {
    table(&[
        ("S1", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S2", &[("Gene", "TP53"), ("Form", "Missense")]),
        ("S3", &[("Gene", "KRAS"), ("Form", "Nonsense")]),
    ])
}

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write test file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_rows_when_building_table_then_keeps_fields() {
        init_test_setup();
        let table = gene_form_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[2].get("Gene"), Some("KRAS"));
    }
}
