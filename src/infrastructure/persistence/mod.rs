mod pg_url_repository;

pub use pg_url_repository::PgUrlRepository;
