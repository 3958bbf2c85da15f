/// User primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Widgets are keyed by UUID so clients can reference them before a reload.
pub type WidgetId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
