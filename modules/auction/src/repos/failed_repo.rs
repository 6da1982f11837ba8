use sqlx::PgPool;

use crate::alert::FaultAlert;

/// Store an escalated fault in `failed_events`
///
/// Replayed faults for the same fault_id only refresh the stored copy.
pub async fn insert_failed_event(pool: &PgPool, alert: &FaultAlert) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO failed_events
            (fault_id, event_id, event_type, consumer, failure_kind, attempts, error, fault_json)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (fault_id) DO UPDATE
        SET error = EXCLUDED.error,
            fault_json = EXCLUDED.fault_json,
            failed_at = NOW()
        "#,
    )
    .bind(alert.fault_id)
    .bind(alert.event_id)
    .bind(&alert.event_type)
    .bind(&alert.consumer)
    .bind(alert.kind.as_str())
    .bind(alert.attempts as i32)
    .bind(alert.summary())
    .bind(&alert.fault_json)
    .execute(pool)
    .await?;

    Ok(())
}
