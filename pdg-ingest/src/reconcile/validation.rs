//! Structural validation of catalog records

use pdg_common::models::{ArtworkRecord, PublicDomain};
use std::fmt;

/// Size and shape constraints for catalog records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationRules {
    pub min_size_cm: f64,
    pub aspect_ratio_min: f64,
    pub aspect_ratio_max: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_size_cm: 100.0,
            aspect_ratio_min: 0.85,
            aspect_ratio_max: 1.15,
        }
    }
}

/// Why a record was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    MissingDimensions,
    AspectRatio(f64),
    TooSmall { height_cm: f64, width_cm: f64 },
    MissingImage,
    NotPublicDomain,
}

impl Rejection {
    /// Stable key used in summary counts
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingDimensions => "missingDimensions",
            Rejection::AspectRatio(_) => "aspectRatio",
            Rejection::TooSmall { .. } => "tooSmall",
            Rejection::MissingImage => "missingImage",
            Rejection::NotPublicDomain => "notPublicDomain",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingDimensions => write!(f, "missing dimensions"),
            Rejection::AspectRatio(ratio) => write!(f, "aspect ratio {:.2} out of range", ratio),
            Rejection::TooSmall { height_cm, width_cm } => {
                write!(f, "too small ({} × {} cm)", height_cm, width_cm)
            }
            Rejection::MissingImage => write!(f, "missing image URL"),
            Rejection::NotPublicDomain => write!(f, "not public domain"),
        }
    }
}

impl ValidationRules {
    /// Check a record; all constraints must hold
    pub fn check(&self, record: &ArtworkRecord) -> Result<(), Rejection> {
        let (height, width) = match (record.height_cm, record.width_cm) {
            (Some(h), Some(w)) if h > 0.0 && w > 0.0 => (h, w),
            _ => return Err(Rejection::MissingDimensions),
        };

        let ratio = width / height;
        if ratio < self.aspect_ratio_min || ratio > self.aspect_ratio_max {
            return Err(Rejection::AspectRatio(ratio));
        }

        if height < self.min_size_cm || width < self.min_size_cm {
            return Err(Rejection::TooSmall {
                height_cm: height,
                width_cm: width,
            });
        }

        if record.image_url.trim().is_empty() {
            return Err(Rejection::MissingImage);
        }

        if record.public_domain == PublicDomain::No {
            return Err(Rejection::NotPublicDomain);
        }

        Ok(())
    }
}
