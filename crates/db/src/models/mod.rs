//! Row types for the `users`, `chat_messages`, and `call_records` tables.

pub mod call_record;
pub mod chat_message;
pub mod user;
