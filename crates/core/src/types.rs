/// Surrogate keys are 64-bit integers in every supported dialect.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
