pub mod app;
pub mod config;
pub mod document;
pub mod file;
pub mod util;
