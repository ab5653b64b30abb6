use sqlx::SqliteConnection;

use crate::{
    db_types::{NewObservation, Observation, OrderId},
    helpers::ObservationOutcome,
};

/// Appends an observation, along with the outcome it had, to the observation log.
pub async fn insert_observation(
    observation: &NewObservation,
    outcome: &ObservationOutcome,
    conn: &mut SqliteConnection,
) -> Result<Observation, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO observations (order_id, origin, raw_status, normalized_status, outcome, payload, observed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *"#,
    )
    .bind(&observation.order_id)
    .bind(observation.origin)
    .bind(&observation.raw_status)
    .bind(observation.status.to_string())
    .bind(outcome.as_str())
    .bind(&observation.payload)
    .bind(observation.observed_at)
    .fetch_one(conn)
    .await
}

pub async fn fetch_observations(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Observation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM observations WHERE order_id = $1 ORDER BY id ASC").bind(order_id).fetch_all(conn).await
}
