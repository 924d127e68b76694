/// Error types shared across the funnel service crates.
///
/// These cover the infrastructure pieces (Redis, JSON encoding of stored entries) that every
/// service touches. Service-specific errors live in each crate and wrap `CommonError` via
/// `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis not configured")]
    RedisUnavailable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
