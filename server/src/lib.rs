pub mod config;
pub mod db;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod utils;
