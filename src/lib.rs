pub mod buyer;
pub mod config;
pub mod datasource;
pub mod telegram;
