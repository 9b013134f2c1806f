//! # grade-engine
//!
//! Color-grading operations for a host application: apply a LUT or transfer
//! function to encoded images, synthesize LUTs from sliders or `.cube`
//! files, match histograms against a reference and export tile textures.
//!
//! # Architecture
//!
//! ```text
//! GradingEngine
//!     +-- EngineConfig        (YAML + GRADE_* overrides)
//!     +-- SamplerSelector     (cpu | gpu with CPU fallback)
//!     +-- LutRegistry         (named presets)
//!     +-- WorkerPool          (per-image CPU work, ordered results)
//!     +-- ObjectStore         (optional: presets, cached textures)
//!     +-- UsageGate           (optional: entitled or one free use)
//! ```
//!
//! # Example
//!
//! ```rust
//! use grade_engine::{EngineConfig, GradingEngine, Transform};
//! use grade_compute::{Engine, SamplerSelector};
//! use grade_io::{ImageData, OutputFormat};
//! use grade_ops::AdjustmentSettings;
//!
//! let config = EngineConfig { workers: 1, ..Default::default() };
//! let engine = GradingEngine::with_selector(config, SamplerSelector::cpu_only()).unwrap();
//!
//! let image = ImageData::new(2, 1, 3, vec![10, 20, 30, 200, 210, 220]).unwrap();
//! let png = grade_io::encode(&image, OutputFormat::Png).unwrap();
//!
//! let settings = AdjustmentSettings { exposure: 1.0, ..Default::default() };
//! let out = engine
//!     .apply(&png, &Transform::Procedural(settings), Engine::Cpu, 1.0, OutputFormat::Png)
//!     .unwrap();
//! let graded = grade_io::decode(&out).unwrap();
//! assert!(graded.data[0] > image.data[0]);
//! ```

pub mod access;
pub mod config;
mod engine;
mod error;
mod matcher;
mod report;
pub mod store;
mod transform;

pub use access::{EntitledSet, Entitlements, UsageGate};
pub use config::{EngineConfig, OutputKind};
pub use engine::{GradingEngine, PRESET_PREFIX, TEXTURE_PREFIX};
pub use error::{EngineError, EngineResult};
pub use matcher::HistogramMatcher;
pub use report::{BatchReport, ItemReport};
pub use store::{FsStore, MemoryStore, ObjectStore};
pub use transform::Transform;
