pub mod bulk;
pub mod config;
pub mod error;
pub mod export;
pub mod progress;
pub mod reader;
pub mod verify;
