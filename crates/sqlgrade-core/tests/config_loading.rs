use sqlgrade_core::config::load_config;
use sqlgrade_core::model::{DisplayPolicy, QuestionKind};
use sqlgrade_core::sandbox::DatabaseSource;
use std::io::Write;
use tempfile::NamedTempFile;

const VALID: &str = r#"
configVersion: 1
question: orders_schema
kind: ddl
database: data/eshop.db
answer: |
  CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT);
settings:
  memory_limit_mb: 256
  timeout_ms: 5000
  max_width: 120
testcases:
  - code: "INSERT INTO orders VALUES (1, 'open');"
    result: "expected text"
    extra:
      flexible_datatypes:
        - attribute: status
          allowed_types: ["ENUM", "TEXT"]
          used_in_tables: [Orders]
    hide_rest_if_fail: true
    display: hide_if_fail
  - code: "test_table_correctness orders"
    max_score: 2.0
"#;

fn write_config(dir: &std::path::Path, body: &str) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join("question.yaml");
    std::fs::write(&path, body)?;
    Ok(path)
}

#[test]
fn loads_question_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_config(dir.path(), VALID)?;
    let cfg = load_config(&path, true)?;

    assert_eq!(cfg.kind, QuestionKind::Ddl);
    assert!(!cfg.check_results);
    assert!(cfg.database_connection);
    assert_eq!(
        cfg.database_source(),
        DatabaseSource::File(dir.path().join("data/eshop.db"))
    );

    let limits = cfg.settings.limits();
    assert_eq!(limits.memory_limit_mb, 256);
    assert_eq!(limits.timeout_ms, Some(5000));
    let render = cfg.settings.render();
    assert_eq!((render.max_rows, render.max_width), (40, 120));
    assert_eq!(cfg.settings.parallel(), 4);

    let first = &cfg.testcases[0];
    assert_eq!(first.expected_text(), "expected text");
    assert!(first.hide_rest_if_fail);
    assert_eq!(first.display, DisplayPolicy::HideIfFail);
    assert!(first.extra.flexible_tables().contains("orders"));
    assert_eq!(cfg.testcases[1].max_score, 2.0);
    assert_eq!(cfg.testcases[1].expected_result, None);
    Ok(())
}

#[test]
fn in_memory_marker_is_not_resolved() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let body = VALID.replace("data/eshop.db", "\":memory:\"");
    let cfg = load_config(&write_config(dir.path(), &body)?, true)?;
    assert_eq!(cfg.database_source(), DatabaseSource::InMemory);
    Ok(())
}

#[test]
fn strict_mode_rejects_unknown_fields() -> anyhow::Result<()> {
    let mut f = NamedTempFile::new()?;
    write!(f, "{}\nanswr: typo\n", VALID)?;

    let err = load_config(f.path(), true).unwrap_err();
    assert!(err.to_string().contains("answr"), "{}", err);

    let cfg = load_config(f.path(), false)?;
    assert_eq!(cfg.question, "orders_schema");
    Ok(())
}

#[test]
fn anchors_under_conventional_keys_are_ignored() -> anyhow::Result<()> {
    let mut f = NamedTempFile::new()?;
    write!(f, "x-shared: &code \"SELECT 1;\"\n{}", VALID)?;
    assert!(load_config(f.path(), true).is_ok());
    Ok(())
}

#[test]
fn rejects_unsupported_version() -> anyhow::Result<()> {
    let mut f = NamedTempFile::new()?;
    write!(f, "{}", VALID.replace("configVersion: 1", "configVersion: 7"))?;
    let err = load_config(f.path(), false).unwrap_err();
    assert!(err.0.contains("unsupported config version 7"));
    Ok(())
}

#[test]
fn rejects_config_without_testcases() -> anyhow::Result<()> {
    let mut f = NamedTempFile::new()?;
    let body = VALID.split("testcases:").next().unwrap_or_default().to_string();
    write!(f, "{}testcases: []\n", body)?;
    let err = load_config(f.path(), false).unwrap_err();
    assert!(err.0.contains("no testcases"));
    Ok(())
}

#[test]
fn unreadable_file_is_a_config_error() {
    let err = load_config(std::path::Path::new("/definitely/not/here.yaml"), false).unwrap_err();
    assert!(err.to_string().starts_with("config error: failed to read config"));
}
