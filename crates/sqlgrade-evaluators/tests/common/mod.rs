#![allow(dead_code)]

use rusqlite::Connection;
use sqlgrade_core::model::{EvaluationOutcome, Testcase};
use sqlgrade_core::evaluator::Evaluator;
use sqlgrade_core::sandbox::{DatabaseSource, Sandbox, SandboxLimits};
use std::path::{Path, PathBuf};

/// Small shop database with a decoy copy of `customers`.
pub fn eshop(dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join("eshop.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
         CREATE TABLE archive_customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             customer_id INTEGER REFERENCES customers (id),
             total REAL NOT NULL
         );
         INSERT INTO customers VALUES (1, 'Ada', 'Berlin'), (2, 'Linus', 'Helsinki');
         INSERT INTO archive_customers SELECT * FROM customers;
         INSERT INTO orders VALUES (1, 1, 120.0), (2, 1, 15.5), (3, 2, 42.0);",
    )?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(path)
}

/// Sandbox working copies still on disk in `dir`.
pub fn leftover_copies(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.to_string_lossy().ends_with(".copy") {
            out.push(path);
        }
    }
    Ok(out)
}

pub fn evaluate(
    evaluator: &dyn Evaluator,
    source: &DatabaseSource,
    answer: &str,
    tc: &mut Testcase,
) -> anyhow::Result<EvaluationOutcome> {
    let sandbox = Sandbox::acquire(source, &SandboxLimits::default())?;
    Ok(evaluator.evaluate(sandbox, answer, tc))
}

/// Golden result of `reference` for `tc`, stored on the testcase.
pub fn golden(
    evaluator: &dyn Evaluator,
    source: &DatabaseSource,
    reference: &str,
    tc: &mut Testcase,
) -> anyhow::Result<()> {
    let out = evaluate(evaluator, source, reference, tc)?;
    assert!(!out.aborted, "reference failed: {:?}", out.errors);
    tc.expected_result = Some(out.received);
    Ok(())
}
