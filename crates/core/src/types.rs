/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Chat-platform snowflake (guild, user, channel, role), kept in string form.
pub type PlatformId = String;
