mod repository;
mod schema;

pub use repository::ContentRepository;
pub use schema::SCHEDULE_SCHEMA;
