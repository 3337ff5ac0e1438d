//! User Record Store: Firestore-backed document access for user records,
//! plus an in-process store for tests and auth-disabled local runs.

pub mod bootstrap;
pub mod firestore;
pub mod memory;
pub mod value;

pub use bootstrap::ensure_user;
pub use firestore::FirestoreClient;
pub use memory::MemoryUserStore;
