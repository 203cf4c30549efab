use crate::domain::{errors::DomainError, Document};

pub trait DocumentLoader: Send + Sync {
    fn load(&self) -> Result<Vec<Document>, DomainError>;
}
