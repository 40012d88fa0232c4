pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod ui;

pub use db::Db;
pub use error::{Error, Result};
pub use models::{Task, WorkEntry};
