//! SeaORM-backed filter configuration store

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use super::entities::{self, content_filter, filter_violation};
use super::migration::Migrator;
use crate::config::DatabaseConfig;
use crate::storage::records::{ContentFilterRecord, FilterViolationRecord};
use crate::storage::store::FilterStore;
use crate::utils::error::{GatewayError, Result};

/// SeaORM-based implementation of [`FilterStore`]
#[derive(Debug)]
pub struct SeaOrmFilterStore {
    db: DatabaseConnection,
}

impl SeaOrmFilterStore {
    /// Create a new database connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut opt = ConnectOptions::new(config.url.clone());
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connection_timeout))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let db = Database::connect(opt)
            .await
            .map_err(GatewayError::Database)?;

        info!("Filter store connection established");
        Ok(Self { db })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running filter store migrations...");
        Migrator::up(&self.db, None).await.map_err(|e| {
            warn!("Migration failed: {}", e);
            GatewayError::Database(e)
        })?;
        info!("Filter store migrations completed");
        Ok(())
    }

    /// Underlying connection, for callers that share the pool
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl FilterStore for SeaOrmFilterStore {
    async fn list_enabled(&self, organization_id: &str) -> Result<Vec<ContentFilterRecord>> {
        debug!("Loading enabled filters for organization {}", organization_id);

        let models = entities::ContentFilter::find()
            .filter(content_filter::Column::OrganizationId.eq(organization_id))
            .filter(content_filter::Column::Enabled.eq(true))
            .order_by_asc(content_filter::Column::Priority)
            .order_by_asc(content_filter::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(GatewayError::Database)?;

        let mut records = Vec::with_capacity(models.len());
        for model in models {
            records.push(model.to_record()?);
        }
        Ok(records)
    }

    async fn upsert(&self, record: &ContentFilterRecord) -> Result<()> {
        debug!(
            "Saving filter '{}' for organization {}",
            record.name, record.organization_id
        );

        let existing = entities::ContentFilter::find()
            .filter(content_filter::Column::OrganizationId.eq(record.organization_id.as_str()))
            .filter(content_filter::Column::Name.eq(record.name.as_str()))
            .one(&self.db)
            .await
            .map_err(GatewayError::Database)?;

        let config = serde_json::Value::Object(record.config.clone());
        let now = chrono::Utc::now();

        match existing {
            Some(model) => {
                let mut active: content_filter::ActiveModel = model.into();
                active.description = Set(record.description.clone());
                active.filter_type = Set(record.filter_type.to_string());
                active.enabled = Set(record.enabled);
                active.priority = Set(record.priority);
                active.config = Set(config);
                active.updated_at = Set(now.into());
                active.update(&self.db).await.map_err(GatewayError::Database)?;
            }
            None => {
                let active = content_filter::ActiveModel {
                    id: Set(record.id),
                    organization_id: Set(record.organization_id.clone()),
                    name: Set(record.name.clone()),
                    description: Set(record.description.clone()),
                    filter_type: Set(record.filter_type.to_string()),
                    enabled: Set(record.enabled),
                    priority: Set(record.priority),
                    config: Set(config),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    created_by: Set(record.created_by.clone()),
                };
                entities::ContentFilter::insert(active)
                    .exec(&self.db)
                    .await
                    .map_err(GatewayError::Database)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, organization_id: &str, name: &str) -> Result<()> {
        debug!(
            "Deleting filter '{}' for organization {}",
            name, organization_id
        );

        let result = entities::ContentFilter::delete_many()
            .filter(content_filter::Column::OrganizationId.eq(organization_id))
            .filter(content_filter::Column::Name.eq(name))
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;

        if result.rows_affected == 0 {
            return Err(GatewayError::NotFound(format!(
                "filter '{}' not found for organization '{}'",
                name, organization_id
            )));
        }
        Ok(())
    }

    async fn append_violation(&self, violation: &FilterViolationRecord) -> Result<()> {
        let active = filter_violation::ActiveModel {
            id: Set(violation.id),
            organization_id: Set(violation.organization_id.clone()),
            filter_id: Set(violation.filter_id.clone()),
            request_id: Set(violation.request_id.clone()),
            session_id: Set(violation.session_id.clone()),
            server_id: Set(violation.server_id.clone()),
            violation_type: Set(violation.violation_type.clone()),
            action_taken: Set(violation.action_taken.clone()),
            content_snippet: Set(violation.content_snippet.clone()),
            pattern_matched: Set(violation.pattern_matched.clone()),
            severity: Set(violation.severity.clone()),
            user_id: Set(violation.user_id.clone()),
            remote_ip: Set(violation.remote_ip.clone()),
            user_agent: Set(violation.user_agent.clone()),
            direction: Set(violation.direction.clone()),
            metadata: Set(serde_json::Value::Object(violation.metadata.clone())),
            created_at: Set(violation.created_at.into()),
        };

        entities::FilterViolation::insert(active)
            .exec(&self.db)
            .await
            .map_err(GatewayError::Database)?;
        Ok(())
    }

    async fn list_violations(
        &self,
        organization_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FilterViolationRecord>> {
        let models = entities::FilterViolation::find()
            .filter(filter_violation::Column::OrganizationId.eq(organization_id))
            .order_by_desc(filter_violation::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(GatewayError::Database)?;

        Ok(models.iter().map(|m| m.to_record()).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(GatewayError::Database)
    }
}
