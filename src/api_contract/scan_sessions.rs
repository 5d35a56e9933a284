use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateScanSessionResponse {
    pub session_id: String,
}

#[derive(Deserialize, Debug)]
pub struct ScanUrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScanUrlResponse {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScannedUrlsResponse {
    pub urls: Vec<String>,
}

/// Frame pushed to every subscriber when a URL is scanned into its session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScannedUrlFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub url: String,
}

impl ScannedUrlFrame {
    pub fn new(url: &str) -> Self {
        Self {
            frame_type: "scanned-url".to_string(),
            url: url.to_string(),
        }
    }
}
