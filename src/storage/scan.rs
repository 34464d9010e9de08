use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::product::{derive_product_name, UNKNOWN_PRODUCT};
use crate::image::is_data_image;

/// Image reference stored when the upload itself isn't kept.
pub const PLACEHOLDER_IMAGE: &str = "placeholder";

/// Listing snippets are cut to this many characters.
pub const SNIPPET_LEN: usize = 100;

/// One completed analysis, owned by the user who ran it.
///
/// Created once when a stream finishes and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub product_name: Option<String>,
    pub analysis_result: String,
    pub created_at: DateTime<Utc>,
}

impl Scan {
    /// Build a new record, deriving the product name from the text.
    pub fn new(user_id: &str, image_url: &str, analysis_result: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            product_name: derive_product_name(&analysis_result),
            analysis_result,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn display_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(UNKNOWN_PRODUCT)
    }

    pub fn has_image(&self) -> bool {
        is_data_image(&self.image_url)
    }
}

/// Listing-view projection of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub id: String,
    pub product_name: String,
    pub snippet: String,
    pub has_image: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Scan> for ScanSummary {
    fn from(scan: &Scan) -> Self {
        Self {
            id: scan.id.clone(),
            product_name: scan.display_name().to_string(),
            snippet: snippet(&scan.analysis_result, SNIPPET_LEN),
            has_image: scan.has_image(),
            created_at: scan.created_at,
        }
    }
}

/// Single-line preview: newlines become spaces, cut with an ellipsis.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ");
    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= max_chars {
        return cleaned.to_string();
    }
    let cut: String = cleaned.chars().take(max_chars).collect();
    format!("{cut}...")
}
