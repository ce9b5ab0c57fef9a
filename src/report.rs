//! Microtask report: records, pagination, and export artifacts

mod artifact;
mod bundle;
mod layout;
mod model;
mod paginate;
mod render;
mod wrap;

pub use artifact::{ArtifactSink, FileArtifactSink};
pub use bundle::ExportBundle;
pub use model::{AttachmentMeta, MicrotaskRecord, ReportMetadata};
pub use paginate::paginate;

#[allow(unused_imports)] // Public API re-exports
pub use artifact::ExportError;
#[allow(unused_imports)] // Public API re-exports
pub use layout::{Block, LayoutConfig, Page, PlacedBlock, ReportDocument};
#[allow(unused_imports)] // Public API re-exports
pub use model::{DetailStep, Hierarchy, WeightValue};
#[allow(unused_imports)] // Public API re-exports
pub use paginate::{detail_lines, paginate_with};
