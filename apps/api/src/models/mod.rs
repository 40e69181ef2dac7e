pub mod document;
pub mod optimization;

pub use document::{Document, ExtractedText};
pub use optimization::{OptimizationRequest, OptimizationResult};
