pub mod chat;
pub mod health;
pub mod institutions;
pub mod sessions;
