//! Conversions from external infrastructure errors into domain errors.

use meridian_domain::MeridianError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MeridianError);

impl From<InfraError> for MeridianError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MeridianError> for InfraError {
    fn from(value: MeridianError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(err: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;

        let mapped = match &err {
            SqlError::SqliteFailure(code, _) => match code.code {
                ErrorCode::DatabaseBusy => MeridianError::Database("database is busy".into()),
                ErrorCode::DatabaseLocked => MeridianError::Database("database is locked".into()),
                ErrorCode::ConstraintViolation => {
                    MeridianError::Database(format!("constraint violation: {err}"))
                }
                _ => MeridianError::Database(err.to_string()),
            },
            SqlError::QueryReturnedNoRows => MeridianError::NotFound("no rows returned".into()),
            _ => MeridianError::Database(err.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        InfraError(MeridianError::Database(format!("connection pool error: {err}")))
    }
}

/// Is this the store's uniqueness backstop firing (e.g. a second channel for
/// the same user+calendar racing past the existence check)?
pub fn is_unique_violation(err: &MeridianError) -> bool {
    matches!(err, MeridianError::Database(msg) if msg.contains("constraint violation"))
}
