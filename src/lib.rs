pub mod aggregate;
pub mod app;
pub mod config;
pub mod models;
pub mod tmdb;
pub mod view;
