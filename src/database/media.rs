use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ApiError, Error, TypeError};

/// An inline `data:image/...;base64,...` payload decoded to its binary
/// form, with the file extension taken from the MIME-type prefix.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl ImageUpload {
    pub fn parse(data: &str) -> Result<Self, TypeError> {
        let rest = data
            .strip_prefix("data:image/")
            .ok_or(TypeError::new("Image must be a base64 data URI"))?;

        let (extension, payload) = rest
            .split_once(";base64,")
            .ok_or(TypeError::new("Image must be base64 encoded"))?;

        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::new("Invalid image format"));
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|_| TypeError::new("Invalid base64 payload"))?;

        Ok(Self {
            bytes,
            extension: extension.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", uuid::Uuid::new_v4(), self.extension)
    }

    /// Writes the image under `dir` and returns the generated file name,
    /// which is what the recipe row stores.
    pub async fn persist(&self, dir: &Path) -> Result<String, Error> {
        let name = self.file_name();

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::InternalServerError.new(&format!("{e}")))?;
        tokio::fs::write(dir.join(&name), &self.bytes)
            .await
            .map_err(|e| ApiError::InternalServerError.new(&format!("{e}")))?;

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_png_data_uri() {
        // one transparent pixel
        let upload = ImageUpload::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(upload.extension, "png");
        assert_eq!(&upload.bytes[1..4], b"PNG");
    }

    #[test]
    fn file_names_carry_the_extension() {
        let upload = ImageUpload::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert!(upload.file_name().ends_with(".jpeg"));
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(ImageUpload::parse("data:text/plain;base64,AAAA").is_err());
        assert!(ImageUpload::parse("plain string").is_err());
    }

    #[test]
    fn rejects_unencoded_payloads() {
        assert!(ImageUpload::parse("data:image/png,rawbytes").is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(ImageUpload::parse("data:image/png;base64,???").is_err());
    }

    #[tokio::test]
    async fn persists_under_the_media_root() {
        let upload = ImageUpload::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        let dir = std::env::temp_dir().join("mealbook-media-test");

        let name = upload.persist(&dir).await.unwrap();
        let stored = tokio::fs::read(dir.join(&name)).await.unwrap();
        assert_eq!(stored, upload.bytes);

        tokio::fs::remove_file(dir.join(&name)).await.unwrap();
    }
}
