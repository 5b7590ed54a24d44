//! Registry seam: hotel list, import markers and file registration.

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FileRegistration, HotelRef, ImportMarker};

pub use http::HttpRegistry;

/// The downstream system of record for hotels and their import state.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Hotels enabled for sync.
    async fn list_hotels(&self) -> Result<Vec<HotelRef>>;

    /// Last successful import for `hotel`; unset markers come back as `None`.
    async fn get_marker(&self, hotel: &HotelRef) -> Result<ImportMarker>;

    /// Announce one processed artifact.
    async fn register_file(&self, registration: &FileRegistration) -> Result<()>;

    /// Advance the marker. Only called once every registration succeeded.
    async fn set_marker(&self, hotel_key: &str, run_timestamp: &str) -> Result<()>;
}
