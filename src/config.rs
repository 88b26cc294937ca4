use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let base_url = std::env::var("PACT_BASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self { base_url })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!(
                "Invalid PACT_BASE_URL '{}': expected http:// or https:// URL",
                self.base_url
            );
        }

        Ok(())
    }

    pub fn docx_upload_url(&self) -> String {
        self.endpoint("upload-docx/")
    }

    pub fn xlsx_upload_url(&self) -> String {
        self.endpoint("upload-xlsx/")
    }

    pub fn analyze_url(&self) -> String {
        self.endpoint("analyze/")
    }

    // The service routes carry trailing slashes; keep them.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
