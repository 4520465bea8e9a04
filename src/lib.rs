pub mod api;
pub mod app;
pub mod compose;
pub mod config;
pub mod directory;
pub mod feed;
pub mod profile;
pub mod route;
pub mod session;
pub mod tui;
