//! Client-side session and call-request orchestration for an AI sales-agent
//! calling service.

pub mod api;
pub mod app;
pub mod config;
pub mod controllers;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod guard;
pub mod session;
pub mod storage;
pub mod utils;

pub use app::{App, CallRequestPage, CompanyDashboard, Navigation};
pub use error::{ClientError, Result};
pub use session::Role;
