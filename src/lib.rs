/// ScanBase admin service
///
/// Promotion scheduling (event-window resolution) and the admin
/// recovery flow (single-use tokens with optional TOTP verification)
/// for the ScanBase nutrition platform.

pub mod admin;
pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod events;
pub mod recovery;
pub mod server;

pub use context::AppContext;
pub use error::{AppError, AppResult};
