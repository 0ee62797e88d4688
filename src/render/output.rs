//! Writing finished images to disk

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::config::OutputConfig;
use crate::error::Result;
use crate::render::RenderedImage;

/// Names and writes result images under an output directory
#[derive(Debug, Clone)]
pub struct ImageWriter {
    dir: PathBuf,
    prefix: String,
}

impl ImageWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        // Ensure the prefix doesn't end with a separator
        let prefix = prefix.into().trim_end_matches(['-', '_']).to_string();
        Self {
            dir: dir.into(),
            prefix,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.dir, &config.file_prefix)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<prefix>-<yyyymmdd-hhmmss>[-s<seed>]-<id8>.<ext>`
    pub fn file_name(&self, image: &RenderedImage, at: DateTime<Utc>, id: Uuid) -> String {
        let mut name = format!("{}-{}", self.prefix, at.format("%Y%m%d-%H%M%S"));
        if let Some(seed) = image.meta().and_then(|m| m.seed.as_ref()) {
            name.push_str(&format!("-s{}", seed));
        }
        let id = id.simple().to_string();
        format!("{}-{}.{}", name, &id[..8], image.extension())
    }

    /// Decode and write the image, creating the directory if needed
    pub async fn write(&self, image: &RenderedImage) -> Result<PathBuf> {
        let bytes = image.decode()?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(self.file_name(image, Utc::now(), Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;

        info!(path = %path.display(), bytes = bytes.len(), "Wrote image");
        Ok(path)
    }
}
