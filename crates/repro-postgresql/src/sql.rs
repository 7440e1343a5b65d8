//! Statements for the parent/child reproduction schema.
//!
//! The child table references the parent through a foreign key with
//! `ON DELETE CASCADE`; inserting both sides concurrently is what exposes the
//! race being reproduced.

use repro_core::{AttemptGenerator, Operation};

/// Parent table name.
pub const PARENT_TABLE: &str = "p";

/// Child table name.
pub const CHILD_TABLE: &str = "c";

/// Text column value written with every row.
pub const ROW_TEXT: &str = "some text";

/// `INSERT INTO p VALUES (i, 'some text')`
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentInsert;

impl AttemptGenerator for ParentInsert {
    fn generate(&self, index: u64) -> Operation {
        Operation::new(
            index,
            format!("INSERT INTO {PARENT_TABLE} VALUES ({index}, '{ROW_TEXT}')"),
        )
    }
}

/// `INSERT INTO c VALUES (i, i, 'some text')`, child `i` pointing at parent `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildInsert;

impl AttemptGenerator for ChildInsert {
    fn generate(&self, index: u64) -> Operation {
        Operation::new(
            index,
            format!("INSERT INTO {CHILD_TABLE} VALUES ({index}, {index}, '{ROW_TEXT}')"),
        )
    }
}

/// Generate DROP TABLE statement.
pub fn generate_drop_table(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {table_name}")
}

/// Generate the parent CREATE TABLE statement.
pub fn generate_create_parent_table() -> String {
    format!("CREATE TABLE {PARENT_TABLE} (id INT PRIMARY KEY, t TEXT)")
}

/// Generate the child CREATE TABLE statement with the cascading foreign key.
pub fn generate_create_child_table() -> String {
    format!(
        "CREATE TABLE {CHILD_TABLE} (id INT PRIMARY KEY, p_id INT NOT NULL REFERENCES {PARENT_TABLE}(id) ON DELETE CASCADE, t TEXT)"
    )
}

/// Statements that reset the schema, in execution order.
///
/// The child table is dropped first since it depends on the parent.
pub fn schema_statements() -> Vec<String> {
    vec![
        generate_drop_table(CHILD_TABLE),
        generate_drop_table(PARENT_TABLE),
        generate_create_parent_table(),
        generate_create_child_table(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_insert() {
        let op = ParentInsert.generate(42);
        assert_eq!(op.index, 42);
        assert_eq!(op.statement, "INSERT INTO p VALUES (42, 'some text')");
    }

    #[test]
    fn test_child_insert_references_same_parent() {
        let op = ChildInsert.generate(7);
        assert_eq!(op.statement, "INSERT INTO c VALUES (7, 7, 'some text')");
    }

    #[test]
    fn test_generators_are_idempotent() {
        for i in [0, 1, 499, u32::MAX as u64] {
            assert_eq!(ParentInsert.generate(i), ParentInsert.generate(i));
            assert_eq!(ChildInsert.generate(i), ChildInsert.generate(i));
        }
    }

    #[test]
    fn test_schema_statements_order() {
        let statements = schema_statements();
        assert_eq!(
            statements,
            vec![
                "DROP TABLE IF EXISTS c".to_string(),
                "DROP TABLE IF EXISTS p".to_string(),
                "CREATE TABLE p (id INT PRIMARY KEY, t TEXT)".to_string(),
                "CREATE TABLE c (id INT PRIMARY KEY, p_id INT NOT NULL REFERENCES p(id) ON DELETE CASCADE, t TEXT)".to_string(),
            ]
        );
    }
}
