mod common;

use common::{eshop, evaluate, golden, leftover_copies};
use sqlgrade_core::model::{FlexibleDatatype, Testcase};
use sqlgrade_core::render::RenderOptions;
use sqlgrade_core::sandbox::DatabaseSource;
use sqlgrade_evaluators::{DdlEvaluator, HIDDEN_ERROR};

const SCHEMA: &str = "
CREATE TABLE orders (
    id INTEGER PRIMARY KEY,
    status TEXT NOT NULL CHECK (status IN ('open', 'shipped')),
    qty INTEGER
) STRICT;";

fn status_flexible() -> FlexibleDatatype {
    FlexibleDatatype {
        attribute: "status".into(),
        allowed_types: vec!["ENUM(...)".into(), "VARCHAR".into()],
        used_in_tables: vec!["orders".into()],
    }
}

#[test]
fn check_violation_on_plain_table() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let mut tc = Testcase::new("INSERT INTO orders VALUES (1, 'lost', 1);");

    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut tc)?;
    assert_eq!(out.received, "check constraint failed on table orders\n");
    assert!(out.errors.is_empty());
    assert!(tc.additional_info.flex_enum_tables.is_empty());
    Ok(())
}

#[test]
fn check_violation_on_flexible_table_is_recorded() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let mut tc = Testcase::new("INSERT INTO orders VALUES (1, 'lost', 1);");
    tc.extra.flexible_datatypes.push(status_flexible());

    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut tc)?;
    assert_eq!(
        out.received,
        "check constraint failed or wrong enum in table orders\n"
    );
    assert!(tc.additional_info.flex_enum_tables.contains("orders"));
    Ok(())
}

#[test]
fn conversion_failure_follows_flexible_declaration() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let code = "INSERT INTO orders VALUES (1, 'open', 'many');";

    let mut plain = Testcase::new(code);
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut plain)?;
    assert_eq!(out.received, "check constraint failed on table orders\n");

    let mut flex = Testcase::new(code);
    flex.extra.flexible_datatypes.push(status_flexible());
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut flex)?;
    assert_eq!(
        out.received,
        "check constraint failed or wrong enum in table orders\n"
    );
    Ok(())
}

#[test]
fn other_constraints_are_printed_lowercase_only() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let mut tc = Testcase::new(
        "INSERT INTO orders VALUES (1, 'open', 1); INSERT INTO orders VALUES (1, 'shipped', 2);",
    );
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut tc)?;
    assert_eq!(out.received, "unique constraint failed: orders.id\n");
    assert!(out.errors.is_empty());
    Ok(())
}

#[test]
fn generic_errors_are_recorded_and_buffered() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let code = "INSERT INTO shipments VALUES (1); SELECT count(*) AS n FROM orders;";

    let mut tc = Testcase::new(code);
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut tc)?;
    assert!(out.received.starts_with("no such table: shipments\n"));
    assert!(out.received.contains("│ 0 │"));
    assert_eq!(out.errors, vec!["no such table: shipments".to_string()]);
    assert!(!out.aborted);

    let mut hidden = Testcase::new(code);
    hidden.hide_rest_if_fail = true;
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut hidden)?;
    assert_eq!(out.errors, vec![HIDDEN_ERROR.to_string()]);
    Ok(())
}

#[test]
fn broken_answer_stops_before_testcase_code() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = DatabaseSource::File(eshop(dir.path())?);
    let ev = DdlEvaluator::new(RenderOptions::default());

    let mut tc = Testcase::new("INSERT INTO reviews VALUES (1);").with_expected("x");
    let out = evaluate(
        &ev,
        &source,
        "CREATE TABLE reviews (id INTEGER PRIMARY KEY,);",
        &mut tc,
    )?;
    assert!(out.aborted);
    assert!(!out.passed);
    assert_eq!(out.received, "");
    assert!(out.errors[0].contains("syntax error"), "{:?}", out.errors);
    assert!(leftover_copies(dir.path())?.is_empty());
    Ok(())
}

#[test]
fn golden_result_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = DatabaseSource::File(eshop(dir.path())?);
    let ev = DdlEvaluator::new(RenderOptions::default());
    let reference = "CREATE TABLE reviews (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers (id),
        stars INTEGER CHECK (stars BETWEEN 1 AND 5)
    );";

    let mut tc = Testcase::new(
        "INSERT INTO reviews VALUES (1, 1, 5);
         INSERT INTO reviews VALUES (2, 1, 9);
         INSERT INTO reviews VALUES (3, 99, 3);
         SELECT id, stars FROM reviews;",
    );
    golden(&ev, &source, reference, &mut tc)?;
    let expected = tc.expected_text().to_string();
    assert!(expected.starts_with("check constraint failed on table reviews\n"));
    assert!(expected.contains("foreign key constraint failed\n"));

    let student = "create table reviews (id integer primary key, customer_id integer not null references customers(id), stars integer check (stars >= 1 and stars <= 5));";
    let out = evaluate(&ev, &source, student, &mut tc)?;
    assert!(out.passed, "{}", out.received);

    let lax = "CREATE TABLE reviews (id INTEGER PRIMARY KEY, customer_id INTEGER, stars INTEGER);";
    let out = evaluate(&ev, &source, lax, &mut tc)?;
    assert!(!out.passed);
    assert!(leftover_copies(dir.path())?.is_empty());
    Ok(())
}

#[test]
fn table_correctness_directive_expands() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let mut tc = Testcase::new("test_table_correctness orders columns row_count");
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut tc)?;
    assert!(out.received.contains("│ status │"), "{}", out.received);
    assert!(out.received.contains("row_count"));

    let mut bad = Testcase::new("test_table_correctness orders colour");
    let out = evaluate(&ev, &DatabaseSource::InMemory, SCHEMA, &mut bad)?;
    assert!(out.aborted);
    assert!(out.errors[0].contains("colour"));
    Ok(())
}

#[test]
fn keyword_directive_skips_execution() -> anyhow::Result<()> {
    let ev = DdlEvaluator::new(RenderOptions::default());
    let mut tc = Testcase::new("keyword_present CHECK");
    // Not valid SQL; never executed.
    let out = evaluate(&ev, &DatabaseSource::InMemory, "CREATE TABLE t (x CHECK (x > 0)) !!", &mut tc)?;
    assert!(out.passed);
    assert_eq!(out.received, "keyword 'check' is present.");
    Ok(())
}
