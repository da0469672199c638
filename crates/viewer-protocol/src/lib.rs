pub mod message;
pub mod version;
