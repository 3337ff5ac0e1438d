//! PageLens core: shared domain types, errors, and service traits.

pub mod error;
pub mod traits;
pub mod types;

pub use error::PageLensError;
pub use traits::{TextRecognizer, TokenVerifier, UserStore};
pub use types::{
    BatchOcrResult, BoundingBox, OcrData, OcrFragment, OcrResponse, Role, UserPatch, UserRecord,
    VerifiedIdentity,
};
