//! Client for the remote todo collection resource.

mod client;
mod error;
#[cfg(test)]
pub mod fake;
mod types;

pub use client::TodoClient;
pub use error::ApiError;
pub use types::Todo;
