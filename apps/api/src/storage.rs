/// Expands stored resume file references into public URLs.
#[derive(Debug, Clone)]
pub struct StorageLocator {
    base_url: String,
    bucket: String,
}

impl StorageLocator {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    /// Absolute URLs pass through; relative paths are resolved against the
    /// public bucket endpoint. Blank references resolve to nothing.
    pub fn public_url(&self, stored: &str) -> Option<String> {
        let stored = stored.trim();
        if stored.is_empty() {
            return None;
        }
        if stored.starts_with("http://") || stored.starts_with("https://") {
            return Some(stored.to_string());
        }
        Some(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            stored.trim_start_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> StorageLocator {
        StorageLocator::new("https://files.example.co/", "Resumes_lake")
    }

    #[test]
    fn test_relative_path_is_expanded() {
        assert_eq!(
            locator().public_url("/2024/jane.pdf").as_deref(),
            Some("https://files.example.co/storage/v1/object/public/Resumes_lake/2024/jane.pdf")
        );
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let url = "https://cdn.example.com/jane.pdf";
        assert_eq!(locator().public_url(url).as_deref(), Some(url));
    }

    #[test]
    fn test_blank_reference() {
        assert_eq!(locator().public_url("  "), None);
    }
}
