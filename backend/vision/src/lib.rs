//! Recognition Adapter: Google Cloud Vision text detection plus
//! normalization into the uniform OCR result shape.

pub mod client;
pub mod normalize;

pub use client::VisionClient;
pub use normalize::{derive_bounding_box, normalize, synthetic_confidence, TextAnnotation};
