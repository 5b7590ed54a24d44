// src/models/mod.rs

//! Domain models for the connector.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod canonical;
mod config;
mod hotel;
mod outcome;
mod payload;
mod registration;
pub mod source;

// Re-export all public types
pub use canonical::{
    ArtifactKind, CanonicalArtifact, CanonicalBody, DEFAULT_POSITION, HotelConfigData,
    InventoryRecord, ReservationCollection, ReservationRecord, ReservationStatus, RevenueData,
    RevenueRecord, RoomConfig, RoomInventoryData, SegmentCollection, SegmentItem, SegmentKind,
    UNASSIGNED,
};
pub use config::{
    BatchConfig, Config, QueueBackend, QueueConfig, RegistryConfig, ReservationSource,
    RetryConfig, SourceConfig, StorageBackend, StorageConfig, TransformConfig,
};
pub use hotel::{HotelRef, ImportMarker, SyncWindow};
pub use outcome::{BatchSummary, HotelOutcome, HotelReport, RunStage};
pub use payload::{DataKind, RawBundle, RawPayload};
pub use registration::{FileRegistration, QueueTrigger};
