mod url_repository;

pub use url_repository::{InsertOutcome, UrlRepository};

#[cfg(test)]
pub use url_repository::MockUrlRepository;
