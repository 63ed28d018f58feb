#![forbid(unsafe_code)]

pub mod app;
pub mod catches;
pub mod config;
pub mod credential;
pub mod feed;
pub mod identity;
pub mod leaderboard;
pub mod models;
pub mod session;
pub mod store;
pub mod web;

mod error;

pub use app::App;
pub use config::Config;
pub use error::Error;
