//! Client for the remote storage service.
//!
//! [`CloudApi`] is the seam the uploader talks to. [`HttpCloudClient`] is the
//! production implementation on top of `reqwest`; tests substitute mocks.

pub mod api;
pub mod client;
pub mod error;

pub use api::{ApiFuture, CloudApi, PieceUpload};
pub use client::{Endpoints, HttpCloudClient};
pub use error::ApiError;
