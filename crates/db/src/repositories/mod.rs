//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod call_record_repo;
pub mod chat_message_repo;
pub mod user_repo;

pub use call_record_repo::CallRecordRepo;
pub use chat_message_repo::ChatMessageRepo;
pub use user_repo::UserRepo;
