pub mod apperror;
pub mod config;
pub mod layout;
pub mod models;
