// SQLite MessageStore Implementation

use crate::error::{map_queue_error, map_sqlx_error};
use crate::schema::{self, quoted, MESSAGE_COLUMNS};
use async_trait::async_trait;
use leaseq_core::domain::{
    ArchivedMessage, Message, MessageId, MessagePayload, NewMessageBatch, QueueInfo,
    QueueMetrics, QueueName,
};
use leaseq_core::error::{AppError, Result};
use leaseq_core::port::MessageStore;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use tracing::debug;

/// Rows per multi-row INSERT (4 bound parameters each)
const INSERT_CHUNK_ROWS: usize = 1000;

/// Ids per `IN (...)` list
const ID_CHUNK: usize = 1000;

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `QueueNotFound` unless `queue` has a registry entry
    ///
    /// Used by calls that would otherwise never touch the queue's tables.
    async fn ensure_registered(&self, queue: &QueueName) -> Result<()> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM queue_registry WHERE queue_name = ?")
                .bind(queue.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        found
            .map(|_| ())
            .ok_or_else(|| AppError::QueueNotFound(queue.to_string()))
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn create_queue(&self, queue: &QueueName, now_millis: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Registry insert first: the transaction holds the write lock from here on
        let created = sqlx::query(
            "INSERT OR IGNORE INTO queue_registry (queue_name, created_at) VALUES (?, ?)",
        )
        .bind(queue.as_str())
        .bind(now_millis)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected()
            > 0;

        for statement in schema::create_statements(queue) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(queue = %queue, created, "Queue tables provisioned");
        Ok(created)
    }

    async fn drop_queue(&self, queue: &QueueName) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let removed = sqlx::query("DELETE FROM queue_registry WHERE queue_name = ?")
            .bind(queue.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if removed == 0 {
            return Err(AppError::QueueNotFound(queue.to_string()));
        }

        for statement in schema::drop_statements(queue) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn list_queues(&self) -> Result<Vec<QueueInfo>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT queue_name, created_at FROM queue_registry ORDER BY queue_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(name, created_at)| {
                let name = QueueName::new(name).map_err(|e| {
                    AppError::storage_invariant(format!("corrupt queue registry: {}", e))
                })?;
                Ok(QueueInfo { name, created_at })
            })
            .collect()
    }

    async fn insert_batch(
        &self,
        queue: &QueueName,
        batch: &NewMessageBatch,
    ) -> Result<Vec<MessageId>> {
        if batch.is_empty() {
            self.ensure_registered(queue).await?;
            return Ok(Vec::new());
        }

        let table = quoted(&queue.message_table());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut ids = Vec::with_capacity(batch.len());

        for chunk in batch.payloads.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} (read_counter, enqueued_at, visibility_until, payload) ",
                table
            ));
            builder.push_values(chunk, |mut row, payload| {
                row.push_bind(0_i64)
                    .push_bind(batch.enqueued_at)
                    .push_bind(batch.visible_at)
                    .push_bind(payload.as_str());
            });
            builder.push(" RETURNING id");

            // RETURNING order is unspecified; AUTOINCREMENT ids follow row order
            let mut chunk_ids: Vec<MessageId> = builder
                .build_query_scalar::<MessageId>()
                .fetch_all(&mut *tx)
                .await
                .map_err(map_queue_error(queue))?;
            chunk_ids.sort_unstable();
            ids.extend(chunk_ids);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ids)
    }

    async fn read_and_lease(
        &self,
        queue: &QueueName,
        now_millis: i64,
        visible_until: i64,
        quantity: i64,
    ) -> Result<Vec<Message>> {
        let table = quoted(&queue.message_table());
        let sql = format!(
            r#"
            UPDATE {table}
            SET visibility_until = ?,
                read_counter = CASE WHEN read_counter < ? THEN read_counter + 1 ELSE read_counter END
            WHERE id IN (
                SELECT id FROM {table}
                WHERE visibility_until <= ?
                ORDER BY id ASC
                LIMIT ?
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        );

        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(visible_until)
            .bind(i64::MAX)
            .bind(now_millis)
            .bind(quantity)
            .fetch_all(&self.pool)
            .await
            .map_err(map_queue_error(queue))?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn pop(&self, queue: &QueueName, now_millis: i64) -> Result<Option<Message>> {
        let table = quoted(&queue.message_table());
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE id = (
                SELECT id FROM {table}
                WHERE visibility_until <= ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        );

        let row: Option<MessageRow> = sqlx::query_as(&sql)
            .bind(now_millis)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_queue_error(queue))?;

        Ok(row.map(Message::from))
    }

    async fn set_visible_at(
        &self,
        queue: &QueueName,
        id: MessageId,
        visible_at: i64,
    ) -> Result<Option<Message>> {
        let sql = format!(
            "UPDATE {} SET visibility_until = ? WHERE id = ? RETURNING {}",
            quoted(&queue.message_table()),
            MESSAGE_COLUMNS
        );

        let row: Option<MessageRow> = sqlx::query_as(&sql)
            .bind(visible_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_queue_error(queue))?;

        Ok(row.map(Message::from))
    }

    async fn delete_messages(
        &self,
        queue: &QueueName,
        ids: &[MessageId],
    ) -> Result<Vec<MessageId>> {
        let unique: Vec<MessageId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            self.ensure_registered(queue).await?;
            return Ok(Vec::new());
        }

        let table = quoted(&queue.message_table());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut removed = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(ID_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("DELETE FROM {} WHERE id IN (", table));
            push_id_list(&mut builder, chunk);
            builder.push(") RETURNING id");

            let chunk_removed: Vec<MessageId> = builder
                .build_query_scalar::<MessageId>()
                .fetch_all(&mut *tx)
                .await
                .map_err(map_queue_error(queue))?;
            removed.extend(chunk_removed);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(removed)
    }

    async fn archive_messages(
        &self,
        queue: &QueueName,
        ids: &[MessageId],
        archived_at: i64,
    ) -> Result<Vec<MessageId>> {
        let unique: Vec<MessageId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            self.ensure_registered(queue).await?;
            return Ok(Vec::new());
        }

        let messages = quoted(&queue.message_table());
        let archive = quoted(&queue.archive_table());
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut moved = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(ID_CHUNK) {
            // Delete first so the transaction starts with a write
            let mut delete: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("DELETE FROM {} WHERE id IN (", messages));
            push_id_list(&mut delete, chunk);
            delete.push(format!(") RETURNING {}", MESSAGE_COLUMNS));

            let rows: Vec<MessageRow> = delete
                .build_query_as::<MessageRow>()
                .fetch_all(&mut *tx)
                .await
                .map_err(map_queue_error(queue))?;

            if rows.is_empty() {
                continue;
            }

            let mut insert: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} ({}, archived_at) ",
                archive, MESSAGE_COLUMNS
            ));
            insert.push_values(&rows, |mut row, message| {
                row.push_bind(message.id)
                    .push_bind(message.read_counter)
                    .push_bind(message.enqueued_at)
                    .push_bind(message.visibility_until)
                    .push_bind(message.payload.as_str())
                    .push_bind(archived_at);
            });
            insert
                .build()
                .execute(&mut *tx)
                .await
                .map_err(map_queue_error(queue))?;

            moved.extend(rows.iter().map(|row| row.id));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(moved)
    }

    async fn list_archived(&self, queue: &QueueName, limit: i64) -> Result<Vec<ArchivedMessage>> {
        let sql = format!(
            "SELECT {}, archived_at FROM {} ORDER BY id ASC LIMIT ?",
            MESSAGE_COLUMNS,
            quoted(&queue.archive_table())
        );

        let rows: Vec<ArchivedRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_queue_error(queue))?;

        Ok(rows.into_iter().map(ArchivedMessage::from).collect())
    }

    async fn metrics(&self, queue: &QueueName, now_millis: i64) -> Result<QueueMetrics> {
        let messages = quoted(&queue.message_table());
        let archive = quoted(&queue.archive_table());

        // One statement, one snapshot
        let sql = format!(
            r#"
            SELECT
                (SELECT COUNT(*) FROM {messages}) AS queue_length,
                (SELECT COUNT(*) FROM {messages} WHERE visibility_until <= ?) AS visible_length,
                (SELECT COUNT(*) FROM {archive}) AS archived_length,
                (SELECT MIN(enqueued_at) FROM {messages}) AS oldest_enqueued_at,
                (SELECT MAX(enqueued_at) FROM {messages}) AS newest_enqueued_at,
                COALESCE(
                    (SELECT seq FROM sqlite_sequence WHERE name = ? COLLATE NOCASE),
                    0
                ) AS total_messages
            "#
        );

        let row: MetricsRow = sqlx::query_as(&sql)
            .bind(now_millis)
            .bind(queue.message_table())
            .fetch_one(&self.pool)
            .await
            .map_err(map_queue_error(queue))?;

        let age_secs = |enqueued_at: i64| (now_millis - enqueued_at) / 1000;

        Ok(QueueMetrics {
            queue_name: queue.clone(),
            queue_length: row.queue_length,
            visible_length: row.visible_length,
            archived_length: row.archived_length,
            total_messages: row.total_messages,
            oldest_msg_age_secs: row.oldest_enqueued_at.map(age_secs),
            newest_msg_age_secs: row.newest_enqueued_at.map(age_secs),
            scrape_time: now_millis,
        })
    }
}

fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[MessageId]) {
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}

/// SQLite row of a message table
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    read_counter: i64,
    enqueued_at: i64,
    visibility_until: i64,
    payload: String,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            read_count: row.read_counter,
            enqueued_at: row.enqueued_at,
            visible_at: row.visibility_until,
            payload: MessagePayload::new(row.payload),
        }
    }
}

/// SQLite row of an archive table
#[derive(Debug, sqlx::FromRow)]
struct ArchivedRow {
    #[sqlx(flatten)]
    message: MessageRow,
    archived_at: i64,
}

impl From<ArchivedRow> for ArchivedMessage {
    fn from(row: ArchivedRow) -> Self {
        ArchivedMessage {
            message: row.message.into(),
            archived_at: row.archived_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MetricsRow {
    queue_length: i64,
    visible_length: i64,
    archived_length: i64,
    oldest_enqueued_at: Option<i64>,
    newest_enqueued_at: Option<i64>,
    total_messages: i64,
}
