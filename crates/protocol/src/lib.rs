//! Wire types for the remote storage service.
//!
//! The service exposes a three-phase upload (precreate, per-piece
//! `superfile2` transfer, create) plus a read-only quota probe. Every
//! response carries an `errno`-style status; see [`constants`] for the
//! codes the uploader reacts to.

pub mod constants;
pub mod messages;
pub mod types;

pub use messages::{
    CreateRequest, CreateResponse, PieceUploadQuery, PieceUploadResponse, PrecreateRequest,
    PrecreateResponse, QuotaResponse,
};
pub use types::Credentials;
