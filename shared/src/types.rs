//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Media reference for photos attached to evaluation comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaReference {
    pub id: uuid::Uuid,
    pub file_type: MediaType,
    pub url: String,
    pub original_filename: Option<String>,
}

/// Types of media files
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Document,
    Video,
}
