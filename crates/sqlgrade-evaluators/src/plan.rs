//! Base tables read by a query, taken from its compiled program.

use rusqlite::Connection;
use std::collections::BTreeSet;

/// Opcodes that open a read cursor on a b-tree: a table or one of its indexes.
const SCAN_OPCODES: &[&str] = &["OpenRead", "ReopenIdx"];

/// Lowercased names of the tables `query` scans on the main schema.
///
/// Views are expanded by the compiler, so only their underlying tables
/// appear. Ephemeral, pseudo and automatic-index cursors as well as
/// temp-schema relations are not counted.
pub fn scanned_tables(conn: &Connection, query: &str) -> rusqlite::Result<BTreeSet<String>> {
    let query = query.trim().trim_end_matches(';');
    let mut stmt = conn.prepare(&format!("EXPLAIN {}", query))?;
    let mut rows = stmt.query([])?;

    let mut root_pages = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let opcode: String = row.get(1)?;
        let root_page: i64 = row.get(3)?;
        let db: i64 = row.get(4)?;
        if db == 0 && SCAN_OPCODES.contains(&opcode.as_str()) {
            root_pages.insert(root_page);
        }
    }

    let mut lookup = conn.prepare(
        "SELECT tbl_name FROM sqlite_master WHERE rootpage = ?1 AND type IN ('table', 'index')",
    )?;
    let mut tables = BTreeSet::new();
    for page in root_pages {
        let mut names = lookup.query([page])?;
        while let Some(row) = names.next()? {
            let name: String = row.get(0)?;
            tables.insert(name.to_lowercase());
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let c = Connection::open_in_memory().unwrap();
        c.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
             CREATE INDEX orders_by_customer ON orders (customer_id);
             CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100;",
        )
        .unwrap();
        c
    }

    #[test]
    fn collects_aliased_join_tables() {
        let t = scanned_tables(
            &conn(),
            "SELECT c.name FROM customers AS c JOIN orders o ON o.customer_id = c.id;",
        )
        .unwrap();
        assert_eq!(
            t.into_iter().collect::<Vec<_>>(),
            vec!["customers".to_string(), "orders".to_string()]
        );
    }

    #[test]
    fn expands_views_and_ignores_literals() {
        let c = conn();
        let t = scanned_tables(&c, "SELECT id FROM big_orders").unwrap();
        assert!(t.contains("orders"));
        assert!(!t.contains("big_orders"));

        let t = scanned_tables(&c, "SELECT 1 AS id, 'x' AS name").unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn invalid_query_is_an_error() {
        assert!(scanned_tables(&conn(), "SELEC * FROM customers").is_err());
    }
}
