pub mod config;
pub mod engagement;
