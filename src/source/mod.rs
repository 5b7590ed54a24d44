//! Source adapter seam.
//!
//! The orchestrator only sees `SourceAdapter`; `HostApiClient` is the
//! production implementation over the Host PMS REST API.

pub mod host;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DataKind, HotelRef, RawPayload, SyncWindow};

pub use host::HostApiClient;

/// Fetches one aggregated raw payload per data kind.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch `kind` for `hotel` over `window`.
    ///
    /// Pagination is handled inside; the returned body has the same shape a
    /// single unpaginated response would have.
    async fn fetch(&self, kind: DataKind, hotel: &HotelRef, window: &SyncWindow)
    -> Result<RawPayload>;
}
