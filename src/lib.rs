pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod filter;
pub mod gallery;
pub mod highlight;
pub mod modal;
pub mod page;
pub mod posts;
pub mod refresh;
pub mod status;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
