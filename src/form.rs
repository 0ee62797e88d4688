//! Generation form state
//!
//! Holds the values a user edits before submitting: prompt, negative prompt,
//! dimensions, sampler settings, seed and an optional reference image. The
//! form never talks to the network; [`GenerationForm::build_request`] turns
//! the current values into a wire request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::config::FormDefaults;
use crate::error::{AppError, Result};
use crate::protocol::GenerationRequest;

/// Accepted ranges for form values
pub mod limits {
    use std::ops::RangeInclusive;

    pub const MIN_DIMENSION: u32 = 256;
    pub const DIMENSION_STEP: u32 = 64;
    pub const STEPS: RangeInclusive<u32> = 8..=40;
    pub const MIN_GUIDANCE: f64 = 4.0;
    pub const MAX_GUIDANCE: f64 = 12.0;
    pub const MIN_STRENGTH: f64 = 0.1;
    pub const MAX_STRENGTH: f64 = 0.95;
    /// Exclusive upper bound for generated seeds
    pub const SEED_SPACE: u64 = 1_000_000_000;
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Image types accepted as a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }

    /// Detect the type from the leading bytes of a file
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_SIGNATURE) {
            Some(ImageMime::Png)
        } else if bytes.starts_with(JPEG_SIGNATURE) {
            Some(ImageMime::Jpeg)
        } else {
            None
        }
    }
}

/// A user-selected reference image, held as a base64 data URL.
///
/// The same string is used as the local preview and as the `image` field sent
/// upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    data_url: String,
    mime: ImageMime,
    byte_len: usize,
}

impl ReferenceImage {
    /// Build from raw file contents. Only PNG and JPEG are accepted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mime = ImageMime::sniff(bytes).ok_or_else(|| {
            AppError::InvalidRequest("Reference image must be a PNG or JPEG file".to_string())
        })?;

        Ok(Self {
            data_url: format!("data:{};base64,{}", mime.as_str(), STANDARD.encode(bytes)),
            mime,
            byte_len: bytes.len(),
        })
    }

    /// Read a reference image from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let image = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.display(),
            bytes = image.byte_len,
            mime = image.mime.as_str(),
            "Loaded reference image"
        );
        Ok(image)
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

/// Snap a dimension onto the 64px grid, never below the minimum
pub fn snap_dimension(value: u32) -> u32 {
    let step = limits::DIMENSION_STEP;
    let snapped = (value.saturating_add(step / 2) / step) * step;
    snapped.max(limits::MIN_DIMENSION)
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::InvalidRequest(format!("{} must be a finite number", name)))
    }
}

fn random_seed<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(0..limits::SEED_SPACE).to_string()
}

/// Editable generation parameters
#[derive(Debug, Clone)]
pub struct GenerationForm {
    prompt: String,
    negative: String,
    width: u32,
    height: u32,
    steps: u32,
    guidance: f64,
    seed: String,
    reference: Option<ReferenceImage>,
    strength: f64,
}

impl GenerationForm {
    /// Create a form seeded from configured defaults. Out-of-range defaults are clamped.
    pub fn from_defaults(defaults: &FormDefaults) -> Self {
        let mut form = Self {
            prompt: String::new(),
            negative: defaults.negative.clone(),
            width: snap_dimension(defaults.width),
            height: snap_dimension(defaults.height),
            steps: 0,
            guidance: limits::MIN_GUIDANCE,
            seed: defaults.seed.clone(),
            reference: None,
            strength: limits::MIN_STRENGTH,
        };
        form.set_steps(defaults.steps);
        // Non-finite defaults keep the lower bound set above
        let _ = form.set_guidance(defaults.guidance);
        let _ = form.set_strength(defaults.strength);
        form
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn negative(&self) -> &str {
        &self.negative
    }

    pub fn set_negative(&mut self, negative: impl Into<String>) {
        self.negative = negative.into();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = snap_dimension(width);
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = snap_dimension(height);
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn set_steps(&mut self, steps: u32) {
        self.steps = steps.clamp(*limits::STEPS.start(), *limits::STEPS.end());
    }

    pub fn guidance(&self) -> f64 {
        self.guidance
    }

    pub fn set_guidance(&mut self, guidance: f64) -> Result<()> {
        self.guidance =
            finite("guidance", guidance)?.clamp(limits::MIN_GUIDANCE, limits::MAX_GUIDANCE);
        Ok(())
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f64) -> Result<()> {
        self.strength =
            finite("strength", strength)?.clamp(limits::MIN_STRENGTH, limits::MAX_STRENGTH);
        Ok(())
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Set the seed text as typed. Blank means the backend picks one.
    pub fn set_seed(&mut self, seed: impl Into<String>) {
        self.seed = seed.into();
    }

    /// Keep a non-blank seed; fill a blank one with a random value
    pub fn lock_seed(&mut self) {
        self.lock_seed_with(&mut rand::thread_rng());
    }

    pub fn lock_seed_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.seed.trim().is_empty() {
            self.seed = random_seed(rng);
        }
    }

    /// Always replace the seed with a fresh random value
    pub fn randomize_seed(&mut self) {
        self.randomize_seed_with(&mut rand::thread_rng());
    }

    pub fn randomize_seed_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.seed = random_seed(rng);
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    pub fn attach_reference(&mut self, image: ReferenceImage) {
        self.reference = Some(image);
    }

    /// Read a reference image from disk and attach it
    pub async fn load_reference(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let image = ReferenceImage::load(path).await?;
        self.reference = Some(image);
        Ok(())
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// True when the trimmed prompt is non-empty
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Snapshot the form into a wire request.
    ///
    /// Prompt and seed are trimmed. `image` is only set when a reference image
    /// is attached.
    pub fn build_request(&self) -> Result<GenerationRequest> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::InvalidRequest("Prompt cannot be empty".to_string()));
        }

        Ok(GenerationRequest {
            prompt: prompt.to_string(),
            steps: self.steps,
            guidance: self.guidance,
            width: self.width,
            height: self.height,
            negative: self.negative.clone(),
            seed: self.seed.trim().to_string(),
            image: self.reference.as_ref().map(|r| r.data_url.clone()),
            strength: self.strength,
        })
    }
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self::from_defaults(&FormDefaults::default())
    }
}

impl fmt::Display for GenerationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "prompt:   {}", self.prompt)?;
        writeln!(f, "negative: {}", self.negative)?;
        writeln!(f, "size:     {}x{}", self.width, self.height)?;
        writeln!(f, "steps:    {}", self.steps)?;
        writeln!(f, "guidance: {:.1}", self.guidance)?;
        let seed = if self.seed.trim().is_empty() {
            "(random)"
        } else {
            self.seed.as_str()
        };
        writeln!(f, "seed:     {}", seed)?;
        match &self.reference {
            Some(image) => write!(
                f,
                "image:    {} ({} bytes), strength {:.2}",
                image.mime.as_str(),
                image.byte_len,
                self.strength
            ),
            None => write!(f, "image:    none"),
        }
    }
}
