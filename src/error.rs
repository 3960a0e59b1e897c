use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AttendError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttendError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AttendError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AttendError::NotFound { .. } => "not_found",
            AttendError::Validation(_) => "bad_params",
            AttendError::Store(StoreError::Sqlite(_)) => "db_query_failed",
            AttendError::Store(StoreError::Encode(_)) => "db_update_failed",
        }
    }
}
