//! PageLens HTTP gateway.
//!
//! Sequences the per-request pipeline — bearer authentication, the usage
//! gate, recognition, usage recording — and maps outcomes onto the JSON
//! response contract.

pub mod auth;
pub mod gate;
pub mod ocr_api;
pub mod profile_api;
pub mod recorder;
pub mod server;

pub use gate::{admit, today_utc, Admission, DenyReason, DAILY_LIMIT};
pub use server::{build_router, start_server, AppState, AuthContext, MAX_UPLOAD_BYTES};
