pub mod reminder;
pub mod settings;
pub mod user;

pub use chrono;
