pub mod auth;
pub mod authz;
pub mod group;
pub mod service;
pub mod user;

use serde::Serialize;

/// Message response for simple operations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
