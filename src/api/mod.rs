pub mod backend;
pub mod client;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{CallBackend, DirectoryBackend};
pub use client::ApiClient;
