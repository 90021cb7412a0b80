//! Connection pool metrics.

use sqlx::PgPool;

/// Records connection pool gauges for the metrics endpoint.
pub fn record_pool_metrics(pool: &PgPool) {
    metrics::gauge!("database_connections_active").set(pool.size() as f64);
    metrics::gauge!("database_connections_idle").set(pool.num_idle() as f64);
}
