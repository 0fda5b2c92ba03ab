use uuid::Uuid;

/// Notification emitted after a catalog mutation has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogChange {
    EventCreated {
        event_id: Uuid,
        event: serde_json::Value, // Serialized Event record
        timestamp: i64,
    },
    EventUpdated {
        event_id: Uuid,
        timestamp: i64,
    },
    EventDeleted {
        event_id: Uuid,
        timestamp: i64,
    },
}

impl CatalogChange {
    pub fn created(event_id: Uuid, event: serde_json::Value) -> Self {
        CatalogChange::EventCreated {
            event_id,
            event,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn updated(event_id: Uuid) -> Self {
        CatalogChange::EventUpdated {
            event_id,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn deleted(event_id: Uuid) -> Self {
        CatalogChange::EventDeleted {
            event_id,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Channel name used by subscribers (SSE event type, Kafka key suffix).
    pub fn name(&self) -> &'static str {
        match self {
            CatalogChange::EventCreated { .. } => "event_created",
            CatalogChange::EventUpdated { .. } => "event_updated",
            CatalogChange::EventDeleted { .. } => "event_deleted",
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            CatalogChange::EventCreated { event_id, .. }
            | CatalogChange::EventUpdated { event_id, .. }
            | CatalogChange::EventDeleted { event_id, .. } => *event_id,
        }
    }
}
