//! Inbound message persistence (append-only audit log)

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use scoutlink_common::{Error, Result};

use crate::models::InboundMessage;

/// Repository for the inbound message audit log
#[derive(Clone)]
pub struct MessageStore {
    db: SqlitePool,
}

impl MessageStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one message row. Rows are never updated or deleted.
    pub async fn insert(&self, message: &InboundMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inbound_messages (id, tenant_id, from_phone, body, extracted_url, target_id, received_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.tenant_id.to_string())
        .bind(&message.from_phone)
        .bind(&message.body)
        .bind(&message.extracted_url)
        .bind(message.target_id.map(|id| id.to_string()))
        .bind(message.received_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Phone number of the scout who first submitted a target.
    ///
    /// Used to notify the sender asynchronously from the worker, where the
    /// target row itself carries no phone number.
    pub async fn sender_for_target(&self, target_id: Uuid) -> Result<Option<String>> {
        let phone: Option<String> = sqlx::query_scalar(
            r#"
            SELECT from_phone FROM inbound_messages
            WHERE target_id = ?
            ORDER BY received_at ASC
            LIMIT 1
            "#,
        )
        .bind(target_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(phone)
    }

    /// All messages linked to a target, oldest first
    pub async fn list_for_target(&self, target_id: Uuid) -> Result<Vec<InboundMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM inbound_messages
            WHERE target_id = ?
            ORDER BY received_at ASC
            "#,
        )
        .bind(target_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

fn message_from_row(row: SqliteRow) -> Result<InboundMessage> {
    let id_str: String = row.get("id");
    let tenant_str: String = row.get("tenant_id");
    let target_id: Option<String> = row.get("target_id");
    let received_at: String = row.get("received_at");

    Ok(InboundMessage {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| Error::Internal(format!("Invalid message id in database: {}", e)))?,
        tenant_id: Uuid::parse_str(&tenant_str)
            .map_err(|e| Error::Internal(format!("Invalid tenant id in database: {}", e)))?,
        from_phone: row.get("from_phone"),
        body: row.get("body"),
        extracted_url: row.get("extracted_url"),
        target_id: target_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| Error::Internal(format!("Invalid target id in database: {}", e)))?,
        received_at: super::parse_ts(&received_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn sender_for_target_returns_earliest_linked_sender() {
        let store = MessageStore::new(test_pool().await);
        let tenant = Uuid::new_v4();
        let target = Uuid::new_v4();

        let mut first = InboundMessage::new(tenant, "+491701111111", "link", None, Some(target));
        first.received_at = first.received_at - chrono::Duration::minutes(5);
        store.insert(&first).await.unwrap();

        let reply = InboundMessage::new(tenant, "+491702222222", "2", None, Some(target));
        store.insert(&reply).await.unwrap();

        let sender = store.sender_for_target(target).await.unwrap();
        assert_eq!(sender.as_deref(), Some("+491701111111"));

        assert!(store
            .sender_for_target(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_for_target_is_ordered_oldest_first() {
        let store = MessageStore::new(test_pool().await);
        let tenant = Uuid::new_v4();
        let target = Uuid::new_v4();

        let mut older = InboundMessage::new(tenant, "+1", "first", None, Some(target));
        older.received_at = older.received_at - chrono::Duration::minutes(1);
        store.insert(&older).await.unwrap();
        let newer = InboundMessage::new(tenant, "+1", "second", None, Some(target));
        store.insert(&newer).await.unwrap();

        let messages = store.list_for_target(target).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "first");
        assert_eq!(messages[1].body, "second");
    }
}
