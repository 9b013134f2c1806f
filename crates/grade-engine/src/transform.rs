//! What an apply call maps colors through.

use grade_lut::LutVolume;
use grade_ops::{AdjustmentSettings, TransferLut};

/// Color transform for [`GradingEngine::apply`](crate::GradingEngine::apply).
#[derive(Debug, Clone)]
pub enum Transform {
    /// An already-built volume.
    Volume(LutVolume),
    /// `.cube` file contents.
    Cube(Vec<u8>),
    /// A named preset, resolved through the registry and then the object store.
    Preset(String),
    /// Slider/curve settings, synthesized on demand.
    Procedural(AdjustmentSettings),
    /// Per-channel 8-bit tables from histogram matching.
    Transfer(TransferLut),
}

impl Transform {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Volume(_) => "volume",
            Self::Cube(_) => "cube",
            Self::Preset(_) => "preset",
            Self::Procedural(_) => "procedural",
            Self::Transfer(_) => "transfer",
        }
    }
}

impl From<LutVolume> for Transform {
    fn from(volume: LutVolume) -> Self {
        Self::Volume(volume)
    }
}

impl From<AdjustmentSettings> for Transform {
    fn from(settings: AdjustmentSettings) -> Self {
        Self::Procedural(settings)
    }
}

impl From<TransferLut> for Transform {
    fn from(lut: TransferLut) -> Self {
        Self::Transfer(lut)
    }
}
