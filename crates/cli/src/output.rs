//! Table rendering for command results

use chrono::{DateTime, SecondsFormat, Utc};
use leaseq_core::domain::{ArchivedMessage, Message, QueueInfo, QueueMetrics};
use tabled::{Table, Tabled};

/// RFC 3339 rendering; instants chrono cannot represent fall back to raw millis
fn rfc3339(time: Option<DateTime<Utc>>, millis: i64) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

fn timestamp(millis: i64) -> String {
    rfc3339(DateTime::from_timestamp_millis(millis), millis)
}

fn age(secs: Option<i64>) -> String {
    secs.map(|s| format!("{}s", s)).unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct MessageRow {
    id: i64,
    read_count: i64,
    enqueued_at: String,
    visible_at: String,
    payload: String,
}

impl From<&Message> for MessageRow {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            read_count: message.read_count,
            enqueued_at: rfc3339(message.enqueued_at_utc(), message.enqueued_at),
            visible_at: rfc3339(message.visible_at_utc(), message.visible_at),
            payload: message.payload.as_str().to_string(),
        }
    }
}

#[derive(Tabled)]
struct ArchivedRow {
    id: i64,
    read_count: i64,
    enqueued_at: String,
    archived_at: String,
    payload: String,
}

#[derive(Tabled)]
struct QueueRow {
    queue: String,
    created_at: String,
}

#[derive(Tabled)]
struct MetricRow {
    metric: &'static str,
    value: String,
}

pub fn messages_table(messages: &[Message]) -> String {
    Table::new(messages.iter().map(MessageRow::from)).to_string()
}

pub fn archived_table(archived: &[ArchivedMessage]) -> String {
    Table::new(archived.iter().map(|a| ArchivedRow {
        id: a.message.id,
        read_count: a.message.read_count,
        enqueued_at: rfc3339(a.message.enqueued_at_utc(), a.message.enqueued_at),
        archived_at: timestamp(a.archived_at),
        payload: a.message.payload.as_str().to_string(),
    }))
    .to_string()
}

pub fn queues_table(queues: &[QueueInfo]) -> String {
    Table::new(queues.iter().map(|q| QueueRow {
        queue: q.name.to_string(),
        created_at: timestamp(q.created_at),
    }))
    .to_string()
}

pub fn metrics_table(metrics: &QueueMetrics) -> String {
    let rows = vec![
        MetricRow { metric: "queue", value: metrics.queue_name.to_string() },
        MetricRow { metric: "queue_length", value: metrics.queue_length.to_string() },
        MetricRow { metric: "visible_length", value: metrics.visible_length.to_string() },
        MetricRow { metric: "archived_length", value: metrics.archived_length.to_string() },
        MetricRow { metric: "total_messages", value: metrics.total_messages.to_string() },
        MetricRow { metric: "oldest_msg_age", value: age(metrics.oldest_msg_age_secs) },
        MetricRow { metric: "newest_msg_age", value: age(metrics.newest_msg_age_secs) },
        MetricRow { metric: "scrape_time", value: timestamp(metrics.scrape_time) },
    ];
    Table::new(rows).to_string()
}
