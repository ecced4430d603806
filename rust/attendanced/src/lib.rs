pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod summary;
pub mod upload;
pub mod views;
