// Per-queue DDL
//
// Queue names reach SQL only through a validated QueueName, so the derived
// table names are plain identifiers; they are still double-quoted.
//
// Tables and indexes share one namespace. Index names carry a '$' separator,
// which QueueName never accepts, so no queue's tables can collide with
// another queue's indexes.

use leaseq_core::domain::QueueName;

/// Columns shared by message and archive tables, in SELECT/RETURNING order
pub(crate) const MESSAGE_COLUMNS: &str = "id, read_counter, enqueued_at, visibility_until, payload";

pub(crate) fn quoted(table: &str) -> String {
    format!("\"{}\"", table)
}

fn index_name(table: &str, column: &str) -> String {
    format!("{}${}", table, column)
}

/// Statements provisioning a queue, all idempotent
pub(crate) fn create_statements(queue: &QueueName) -> [String; 4] {
    let messages = queue.message_table();
    let archive = queue.archive_table();

    [
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                read_counter INTEGER NOT NULL DEFAULT 0,
                enqueued_at INTEGER NOT NULL,
                visibility_until INTEGER NOT NULL,
                payload TEXT NOT NULL
            )",
            quoted(&messages)
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (visibility_until)",
            quoted(&index_name(&messages, "visibility_until")),
            quoted(&messages)
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY,
                read_counter INTEGER NOT NULL,
                enqueued_at INTEGER NOT NULL,
                visibility_until INTEGER NOT NULL,
                payload TEXT NOT NULL,
                archived_at INTEGER NOT NULL
            )",
            quoted(&archive)
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (archived_at)",
            quoted(&index_name(&archive, "archived_at")),
            quoted(&archive)
        ),
    ]
}

/// Statements dropping both tables (indexes go with them)
pub(crate) fn drop_statements(queue: &QueueName) -> [String; 2] {
    [
        format!("DROP TABLE IF EXISTS {}", quoted(&queue.message_table())),
        format!("DROP TABLE IF EXISTS {}", quoted(&queue.archive_table())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_are_quoted() {
        let queue = QueueName::new("orders").unwrap();
        let ddl = create_statements(&queue);

        assert!(ddl[0].contains("\"q_orders\""));
        assert!(ddl[1].contains("\"q_orders$visibility_until\""));
        assert!(ddl[2].contains("\"a_orders\""));
        assert_eq!(drop_statements(&queue)[1], "DROP TABLE IF EXISTS \"a_orders\"");
    }

    #[test]
    fn test_index_names_are_outside_queue_namespace() {
        let queue = QueueName::new("x").unwrap();
        let ddl = create_statements(&queue);

        assert!(ddl[1].contains("\"q_x$visibility_until\""));
        assert!(ddl[3].contains("\"a_x$archived_at\""));
        assert!(QueueName::new("x$visibility_until").is_err());
    }
}
