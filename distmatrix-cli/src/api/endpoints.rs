//! Endpoint paths relative to a normalized base URL
//!
//! Deployments expose the API either under a base URL that already ends in
//! `/api` (then paths are bare, e.g. `/health`) or under the bare host (then
//! paths carry the `/api` prefix, e.g. `/api/health`).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    prefix: &'static str,
}

impl Endpoints {
    pub fn new(raw_base_url: &str) -> Self {
        let mut base = raw_base_url.trim().trim_end_matches('/').to_string();

        if !base.starts_with("http://") && !base.starts_with("https://") {
            base = format!("https://{}", base);
        }

        let prefix = if base.ends_with("/api") { "" } else { "/api" };

        Self { base, prefix }
    }

    /// Normalized base URL (scheme guaranteed, no trailing slash)
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn health(&self) -> String {
        self.url("/health")
    }

    pub fn convert_time(&self) -> String {
        self.url("/convert-time")
    }

    pub fn upload_matrix(&self) -> String {
        self.url("/upload-distance-matrix")
    }

    /// Download URL for a result file; the file name is percent-encoded
    pub fn download_result(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.url("/download-result"),
            urlencoding::encode(filename)
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base, self.prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_base_gets_api_prefix() {
        let endpoints = Endpoints::new("http://localhost:5000");
        assert_eq!(endpoints.health(), "http://localhost:5000/api/health");
        assert_eq!(
            endpoints.upload_matrix(),
            "http://localhost:5000/api/upload-distance-matrix"
        );
    }

    #[test]
    fn test_api_suffixed_base_uses_bare_paths() {
        let endpoints = Endpoints::new("https://matrix.example.com/api/");
        assert_eq!(endpoints.base(), "https://matrix.example.com/api");
        assert_eq!(endpoints.health(), "https://matrix.example.com/api/health");
        assert_eq!(
            endpoints.convert_time(),
            "https://matrix.example.com/api/convert-time"
        );
    }

    #[test]
    fn test_missing_scheme_defaults_to_https() {
        let endpoints = Endpoints::new("  matrix.example.com  ");
        assert_eq!(endpoints.base(), "https://matrix.example.com");
        assert_eq!(endpoints.health(), "https://matrix.example.com/api/health");
    }

    #[test]
    fn test_download_filename_is_encoded() {
        let endpoints = Endpoints::new("http://localhost:5000/api");
        assert_eq!(
            endpoints.download_result("result 2025/03.xlsx"),
            "http://localhost:5000/api/download-result/result%202025%2F03.xlsx"
        );
    }
}
