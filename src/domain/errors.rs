use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("ShoppingCart with username={0} is not found")]
    CartNotFound(String),
    #[error("ShoppingCart with username={0} already exists")]
    CartAlreadyExists(String),
    #[error("CartItem with product_id={product_id} is not found in the cart of {username}")]
    ItemNotFound { username: String, product_id: i32 },
    #[error("Discount with code={0} is not found")]
    DiscountNotFound(String),
    #[error("Product with id={0} is not found")]
    ProductNotFound(i32),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Persistence failure: {0}")]
    Persistence(String),
    /// A typed failure reported by a remote service that has no local variant.
    #[error("{kind}: {message}")]
    Rejected { kind: String, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable name of the error kind, as carried in error response bodies.
    pub fn kind(&self) -> &str {
        match self {
            DomainError::CartNotFound(_) => "CartNotFound",
            DomainError::CartAlreadyExists(_) => "CartAlreadyExists",
            DomainError::ItemNotFound { .. } => "ItemNotFound",
            DomainError::DiscountNotFound(_) => "DiscountNotFound",
            DomainError::ProductNotFound(_) => "ProductNotFound",
            DomainError::InvalidInput(_) => "InvalidInput",
            DomainError::Transport(_) => "Transport",
            DomainError::Persistence(_) => "Persistence",
            DomainError::Rejected { kind, .. } => kind,
            DomainError::Internal(_) => "Internal",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::CartNotFound(_)
                | DomainError::ItemNotFound { .. }
                | DomainError::DiscountNotFound(_)
                | DomainError::ProductNotFound(_)
        )
    }
}
