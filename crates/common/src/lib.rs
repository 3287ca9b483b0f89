pub mod config;
pub mod db;
pub mod error;
pub mod pool;
pub mod types;
