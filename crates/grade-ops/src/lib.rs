//! # grade-ops
//!
//! Transform synthesis for the grading engine.
//!
//! - [`ProceduralLutBuilder`] evaluates slider/curve [`AdjustmentSettings`]
//!   at every node of a 17/33/65 grid to produce a [`LutVolume`].
//! - [`HistogramTransferBuilder`] matches a source image's per-channel
//!   distribution to a reference image, producing a 256-entry
//!   [`TransferLut`] per source.
//!
//! # Example
//!
//! ```rust
//! use grade_ops::{AdjustmentSettings, ProceduralLutBuilder};
//!
//! let settings = AdjustmentSettings { exposure: 0.5, resolution: 17, ..Default::default() };
//! let lut = ProceduralLutBuilder::new(settings).build().unwrap();
//! assert_eq!(lut.size(), 17);
//! ```
//!
//! [`LutVolume`]: grade_lut::LutVolume

mod error;
pub mod color;
pub mod curves;
pub mod histogram;
pub mod procedural;
pub mod settings;
pub mod transfer;

pub use error::{OpsError, OpsResult};
pub use curves::Curve;
pub use histogram::{BINS, HistogramCdf};
pub use procedural::{ProceduralLutBuilder, build_procedural};
pub use settings::{AdjustmentSettings, CurvePoint, Curves, Primaries};
pub use transfer::{DEFAULT_WORKING_RESOLUTION, HistogramTransferBuilder, TransferLut};
