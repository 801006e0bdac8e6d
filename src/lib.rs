pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod utils;
pub mod validators;
