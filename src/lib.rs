pub mod app;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod format;
pub mod library;
pub mod media;
pub mod model;
pub mod player;
pub mod status;
pub mod ui;
