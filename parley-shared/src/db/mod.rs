/// Database plumbing
///
/// - [`pool`]: connection pool setup and health checks
/// - [`migrations`]: embedded schema migrations
///
/// Queries live with their models in `crate::models`.

pub mod migrations;
pub mod pool;
