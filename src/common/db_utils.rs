use std::time::Duration;

use sqlx::PgConnection;

use crate::common::error::AppError;

/// Limites aplicados a cada transação de escrita.
#[derive(Debug, Clone, Copy)]
pub struct TxTimeouts {
    pub lock_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for TxTimeouts {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(15),
        }
    }
}

// ---
// Helper de Transação: define os timeouts locais
// ---
/// Aplica `lock_timeout` e `statement_timeout` só para a transação corrente
/// (`is_local = true`). Um estouro vira `AppError::Concurrency`.
pub(crate) async fn apply_tx_timeouts(
    conn: &mut PgConnection,
    timeouts: &TxTimeouts,
) -> Result<(), AppError> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", timeouts.lock_timeout.as_millis()))
        .execute(&mut *conn)
        .await?;

    sqlx::query("SELECT set_config('statement_timeout', $1, true)")
        .bind(format!("{}ms", timeouts.statement_timeout.as_millis()))
        .execute(&mut *conn)
        .await?;

    Ok(())
}
