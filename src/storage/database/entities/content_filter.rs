use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::storage::records::ContentFilterRecord;
use crate::utils::error::GatewayError;

/// Content filter configuration database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_filters")]
pub struct Model {
    /// Filter ID (UUID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning organization
    pub organization_id: String,

    /// Filter name, unique per organization
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Filter type: pii, resource, deny, regex
    #[sea_orm(column_name = "type")]
    pub filter_type: String,

    /// Whether the filter participates in filtering
    pub enabled: bool,

    /// Evaluation order; lower runs first
    pub priority: i32,

    /// Opaque configuration document
    pub config: Json,

    /// Creation timestamp
    pub created_at: DateTimeWithTimeZone,

    /// Last update timestamp
    pub updated_at: DateTimeWithTimeZone,

    /// Creating user, when known
    pub created_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert the database model to the domain record
    pub fn to_record(&self) -> crate::utils::error::Result<ContentFilterRecord> {
        let filter_type = self.filter_type.parse()?;
        let config = match &self.config {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(GatewayError::Validation(format!(
                    "filter '{}' config is not an object: {}",
                    self.name, other
                )));
            }
        };

        Ok(ContentFilterRecord {
            id: self.id,
            organization_id: self.organization_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            filter_type,
            enabled: self.enabled,
            priority: self.priority,
            config,
            created_at: self.created_at.naive_utc().and_utc(),
            updated_at: self.updated_at.naive_utc().and_utc(),
            created_by: self.created_by.clone(),
        })
    }
}
