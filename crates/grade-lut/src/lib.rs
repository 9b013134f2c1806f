//! # grade-lut
//!
//! Look-Up Table (LUT) types and file formats for color grading.
//!
//! This crate provides the in-memory 3D grid used by every grading path,
//! the `.cube` text codec, a directory-backed preset registry and the 2D
//! tile texture layout consumed by shader-side samplers.
//!
//! # Types
//!
//! - [`LutVolume`] - cubic RGB grid with input domain bounds
//! - [`LutRegistry`] - named presets loaded from a directory
//! - [`Texture`] - a volume flattened into `N x N²` pixels
//!
//! # Usage
//!
//! ```rust
//! use grade_lut::{LutVolume, cube};
//!
//! let lut = LutVolume::identity(17).unwrap();
//! let text = cube::serialize_volume(&lut);
//! let parsed = cube::parse_cube(&text).unwrap();
//! assert_eq!(parsed.size(), 17);
//! ```
//!
//! # Axis Convention
//!
//! Red varies fastest, then green, then blue. This holds for storage,
//! for `.cube` rows and for the GPU shader; see [`AXIS_ORDER`].
//!
//! # Dependencies
//!
//! - [`thiserror`] - Error handling
//! - [`tracing`] - Registry diagnostics

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod volume;
mod error;
pub mod cube;
pub mod texture;
pub mod registry;

pub use volume::{LutVolume, Axis, AXIS_ORDER, MAX_SIZE, SUPPORTED_SIZES, grid_entries, node_coord};
pub use error::{LutError, LutResult};
pub use cube::{parse_cube, parse_cube_bytes, read_cube, serialize_cube, serialize_volume, write_cube};
pub use texture::{Texture, export_texture};
pub use registry::LutRegistry;
