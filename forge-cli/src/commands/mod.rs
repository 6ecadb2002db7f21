pub mod auth;
pub mod batch;
pub mod config;
pub mod generate;
pub mod profiles;
pub mod usage;
