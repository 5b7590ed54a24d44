//! Canonical output schema consumed by the downstream processor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved segment code used when a reference has no catalog entry.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// Position given to every catalog item; the downstream sorts by it.
pub const DEFAULT_POSITION: i64 = 9999;

/// Processed artifact kinds, one registration each per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Config,
    Segments,
    Reservations,
    Inventory,
    Revenue,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Config,
        ArtifactKind::Segments,
        ArtifactKind::Reservations,
        ArtifactKind::Inventory,
        ArtifactKind::Revenue,
    ];

    /// Name used in the processed artifact key and the registry file route.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ArtifactKind::Config => "hotel-configs",
            ArtifactKind::Segments => "segments",
            ArtifactKind::Reservations => "reservations",
            ArtifactKind::Inventory => "inventory",
            ArtifactKind::Revenue => "revenue",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact_name())
    }
}

/// One entry of a segment category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentItem {
    pub code: String,
    pub name: String,
    pub enabled_otb: bool,
    pub enabled_revenue: bool,
    pub position: i64,
}

impl SegmentItem {
    pub fn new(code: impl Into<String>, name: impl Into<String>, enabled: bool) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            enabled_otb: enabled,
            enabled_revenue: enabled,
            position: DEFAULT_POSITION,
        }
    }

    /// The fallback descriptor.
    pub fn unassigned() -> Self {
        Self::new(UNASSIGNED, UNASSIGNED, true)
    }

    pub fn is_unassigned(&self) -> bool {
        self.code == UNASSIGNED
    }
}

/// Segment categories a reservation can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    Agency,
    Channel,
    Company,
    Cro,
    Group,
    Package,
    Rate,
    Room,
    Segment,
    SubSegment,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 10] = [
        SegmentKind::Agency,
        SegmentKind::Channel,
        SegmentKind::Company,
        SegmentKind::Cro,
        SegmentKind::Group,
        SegmentKind::Package,
        SegmentKind::Rate,
        SegmentKind::Room,
        SegmentKind::Segment,
        SegmentKind::SubSegment,
    ];
}

/// The processed `segments` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCollection {
    pub agencies: Vec<SegmentItem>,
    pub channels: Vec<SegmentItem>,
    pub companies: Vec<SegmentItem>,
    pub cros: Vec<SegmentItem>,
    pub groups: Vec<SegmentItem>,
    pub packages: Vec<SegmentItem>,
    pub rates: Vec<SegmentItem>,
    pub rooms: Vec<SegmentItem>,
    pub segments: Vec<SegmentItem>,
    pub sub_segments: Vec<SegmentItem>,
}

impl SegmentCollection {
    pub fn items(&self, kind: SegmentKind) -> &[SegmentItem] {
        match kind {
            SegmentKind::Agency => &self.agencies,
            SegmentKind::Channel => &self.channels,
            SegmentKind::Company => &self.companies,
            SegmentKind::Cro => &self.cros,
            SegmentKind::Group => &self.groups,
            SegmentKind::Package => &self.packages,
            SegmentKind::Rate => &self.rates,
            SegmentKind::Room => &self.rooms,
            SegmentKind::Segment => &self.segments,
            SegmentKind::SubSegment => &self.sub_segments,
        }
    }

    pub fn items_mut(&mut self, kind: SegmentKind) -> &mut Vec<SegmentItem> {
        match kind {
            SegmentKind::Agency => &mut self.agencies,
            SegmentKind::Channel => &mut self.channels,
            SegmentKind::Company => &mut self.companies,
            SegmentKind::Cro => &mut self.cros,
            SegmentKind::Group => &mut self.groups,
            SegmentKind::Package => &mut self.packages,
            SegmentKind::Rate => &mut self.rates,
            SegmentKind::Room => &mut self.rooms,
            SegmentKind::Segment => &mut self.segments,
            SegmentKind::SubSegment => &mut self.sub_segments,
        }
    }

    pub fn len(&self) -> usize {
        SegmentKind::ALL.iter().map(|k| self.items(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sellable room type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub code: String,
    pub name: String,
    pub capacity: i64,
    pub category: String,
}

/// The processed `hotel-configs` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelConfigData {
    pub hotel_code: String,
    pub hotel_name: String,
    pub rooms: Vec<RoomConfig>,
    pub room_count: i64,
}

/// Reservation status as the downstream understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    Cancelled = 0,
    CheckedIn = 1,
    CheckedOut = 2,
    Confirmed = 3,
    NoShow = 4,
    Tentative = 5,
}

impl ReservationStatus {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// One stay-date of a reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRecord {
    pub record_date: String,
    pub calendar_date: String,
    pub calendar_date_start: String,
    pub calendar_date_end: String,
    pub created_date: String,
    pub pax: i64,
    pub reservation_id: String,
    pub reservation_id_external: String,
    pub revenue_fb: f64,
    pub revenue_fb_invoice: f64,
    pub revenue_others: f64,
    pub revenue_others_invoice: f64,
    pub revenue_room: f64,
    pub revenue_room_invoice: f64,
    pub rooms: i64,
    pub status: i64,
    pub agency_code: String,
    pub channel_code: String,
    pub company_code: String,
    pub cro_code: String,
    pub group_code: String,
    pub package_code: String,
    pub rate_code: String,
    pub room_code: String,
    pub segment_code: String,
    pub sub_segment_code: String,
}

/// The processed `reservations` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationCollection {
    pub reservations: Vec<ReservationRecord>,
}

/// One room-day of availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub calendar_date: String,
    pub inventory: i64,
    #[serde(rename = "inventoryOOO")]
    pub inventory_ooo: i64,
    #[serde(rename = "inventoryOOI")]
    pub inventory_ooi: i64,
    pub room_code: String,
}

/// The processed `inventory` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInventoryData {
    pub room_inventory: Vec<InventoryRecord>,
}

/// A room-revenue transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    pub calendar_date: String,
    pub charge_code: String,
    pub sales_group: i64,
    pub amount: f64,
}

/// The processed `revenue` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueData {
    pub revenue: Vec<RevenueRecord>,
}

/// Body of a processed artifact, serialized as the bare document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalBody {
    Config(HotelConfigData),
    Segments(SegmentCollection),
    Reservations(ReservationCollection),
    Inventory(RoomInventoryData),
    Revenue(RevenueData),
}

/// A transformed artifact ready for the processed store.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalArtifact {
    pub hotel_key: String,
    pub body: CanonicalBody,
}

impl CanonicalArtifact {
    pub fn new(hotel_key: impl Into<String>, body: CanonicalBody) -> Self {
        Self {
            hotel_key: hotel_key.into(),
            body,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self.body {
            CanonicalBody::Config(_) => ArtifactKind::Config,
            CanonicalBody::Segments(_) => ArtifactKind::Segments,
            CanonicalBody::Reservations(_) => ArtifactKind::Reservations,
            CanonicalBody::Inventory(_) => ArtifactKind::Inventory,
            CanonicalBody::Revenue(_) => ArtifactKind::Revenue,
        }
    }

    /// Number of normalized entries carried by the document.
    pub fn record_count(&self) -> usize {
        match &self.body {
            CanonicalBody::Config(c) => c.rooms.len(),
            CanonicalBody::Segments(s) => s.len(),
            CanonicalBody::Reservations(r) => r.reservations.len(),
            CanonicalBody::Inventory(i) => i.room_inventory.len(),
            CanonicalBody::Revenue(r) => r.revenue.len(),
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.body)
    }
}
