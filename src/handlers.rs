// src/handlers.rs
use serde::Serialize;

/// Envelope for single-resource endpoints. Grid responses carry their own shape.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data }
    }
}
