//! Google Cloud plumbing shared by the Firestore and Vision clients:
//! service-account credential loading and OAuth2 access-token minting.

pub mod credentials;
pub mod token;

pub use credentials::ServiceAccountKey;
pub use token::{TokenSource, CLOUD_PLATFORM_SCOPE};
