pub mod auth;
pub mod calls;
pub mod chat;
pub mod presence;
pub mod users;
