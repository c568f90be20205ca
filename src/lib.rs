pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod lifecycle;
pub mod models;
pub mod triage;
