pub mod service;

pub use service::{Generator, HttpGenerator};
