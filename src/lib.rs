pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod menubar;
pub mod player;
pub mod renderer;
pub mod types;
