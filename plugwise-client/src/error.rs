use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A requested appliance id has no entry in the sensor catalog.
    #[error("unknown appliance id {0}")]
    UnknownAppliance(i32),
}
