pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod sweeper;
