//! Repository error types
//!
//! Every persistence failure reaches the HTTP layer as a [`RepositoryError`]
//! carrying the operation, a coarse kind, and the entity involved. The kind
//! drives the status code; the message is only shown to clients for
//! constraint violations.

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Counting records matching a predicate
    Count,
    /// Fetching a bounded, ordered range of records
    Fetch,
    /// Finding a single record by id
    FindById,
    /// Inserting a new record
    Insert,
    /// Replacing an existing record
    Update,
    /// Deleting a record
    Delete,
    /// Probing the backing store
    Ping,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Fetch => write!(f, "fetch"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Ping => write!(f, "ping"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Record was not found
    NotFound,
    /// Unique or foreign-key constraint violated
    ConstraintViolation,
    /// Backing store cannot be reached
    Unavailable,
    /// Operation timed out
    Timeout,
    /// Row could not be decoded into an entity
    SerializationError,
    /// Underlying database error
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g. "Motorcycle")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Record with the given id does not exist
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl ToString) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Unique key already taken
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Backing store unreachable
    pub fn unavailable(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Unavailable, message)
    }

    /// Operation timed out
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Generic database failure
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Attach the entity type and id
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    /// Attach only the entity type
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Replace the recorded operation
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the backing store was unreachable rather than the request wrong
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::Unavailable | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(ty), Some(id)) => write!(f, " [{}: {}]", ty, id),
            (Some(ty), None) => write!(f, " [{}]", ty),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl RepositoryError {
    /// Classify a sqlx error for the given operation
    pub(crate) fn from_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                Self::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let message = match db.constraint() {
                    Some(constraint) => unique_violation_message(constraint),
                    None => "Operation conflicts with existing data".to_string(),
                };
                Self::constraint_violation(operation, message)
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::constraint_violation(operation, "Referenced record does not exist")
            }
            sqlx::Error::PoolTimedOut => Self::timeout(operation, err.to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::unavailable(operation, err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::new(
                operation,
                RepositoryErrorKind::SerializationError,
                err.to_string(),
            ),
            _ => Self::database_error(operation, err.to_string()),
        }
    }
}

/// Client-facing message for a named unique constraint
pub(crate) fn unique_violation_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "Email is already in use".to_string(),
        "motorcycles_license_plate_key" => "License plate is already registered".to_string(),
        "motorcycles_rfid_key" => "RFID tag is already registered".to_string(),
        other => format!("Duplicate value violates unique constraint {other}"),
    }
}
