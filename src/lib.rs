pub mod analytics;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod nutrition;
pub mod state;
pub mod store;
pub mod workouts;
