//! Tenant persistence

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use scoutlink_common::{Error, Result};

use crate::models::Tenant;

/// Repository for tenants
#[derive(Clone)]
pub struct TenantStore {
    db: SqlitePool,
}

impl TenantStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, ingest_enabled: bool) -> Result<Tenant> {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            ingest_enabled,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO tenants (id, name, ingest_enabled, created_at) VALUES (?, ?, ?, ?)")
            .bind(tenant.id.to_string())
            .bind(&tenant.name)
            .bind(tenant.ingest_enabled as i64)
            .bind(tenant.created_at.to_rfc3339())
            .execute(&self.db)
            .await?;

        Ok(tenant)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let id_str: String = row.get("id");
                let created_at: String = row.get("created_at");
                Ok(Some(Tenant {
                    id: Uuid::parse_str(&id_str)
                        .map_err(|e| Error::Internal(format!("Invalid tenant id in database: {}", e)))?,
                    name: row.get("name"),
                    ingest_enabled: row.get::<i64, _>("ingest_enabled") != 0,
                    created_at: super::parse_ts(&created_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn set_ingest_enabled(&self, id: Uuid, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE tenants SET ingest_enabled = ? WHERE id = ?")
            .bind(enabled as i64)
            .bind(id.to_string())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Seed a default tenant on first boot so a fresh install can accept
    /// webhooks immediately. Returns the existing tenant when one is there.
    pub async fn ensure_default(&self) -> Result<Tenant> {
        let row = sqlx::query("SELECT id FROM tenants ORDER BY created_at ASC LIMIT 1")
            .fetch_optional(&self.db)
            .await?;

        if let Some(row) = row {
            let id_str: String = row.get("id");
            let id = Uuid::parse_str(&id_str)
                .map_err(|e| Error::Internal(format!("Invalid tenant id in database: {}", e)))?;
            return self
                .get(id)
                .await?
                .ok_or_else(|| Error::Internal("Tenant vanished".to_string()));
        }

        let tenant = self.create("default", true).await?;
        tracing::info!(tenant_id = %tenant.id, "Seeded default tenant");
        Ok(tenant)
    }
}
