/// Base abstractions for the domain layer
use std::fmt::Debug;

/// Trait for value objects - immutable objects defined by their attributes
/// Value objects are equal if all their attributes are equal
pub trait ValueObject: Clone + PartialEq + Debug {}

/// Trait for entities - objects with identity that can change over time
/// Entities are equal if their IDs are equal, regardless of other attributes
pub trait Entity: Debug {
    type Id: ValueObject;

    fn id(&self) -> &Self::Id;
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value provided
    InvalidValue(String),
    /// Invalid operation
    InvalidOperation(String),
    /// Two embeddings of different length were compared
    DimensionMismatch { left: usize, right: usize },
    /// An embedding with zero magnitude was compared (cosine is undefined)
    ZeroMagnitude,
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            DomainError::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            DomainError::DimensionMismatch { left, right } => write!(
                f,
                "Dimension mismatch: vectors must be of the same length ({} vs {})",
                left, right
            ),
            DomainError::ZeroMagnitude => {
                write!(f, "Zero magnitude: magnitude of one or both vectors is zero")
            }
        }
    }
}

impl std::error::Error for DomainError {}
