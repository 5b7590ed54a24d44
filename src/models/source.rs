//! Typed views over raw Host PMS responses.
//!
//! Raw payloads are stored verbatim as JSON; these structs are only used by the
//! transformers to read them. Field names mirror the Host API exactly.

use serde::{Deserialize, Serialize};

/// One entry of the hotel configuration catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigItem {
    pub config_type: String,
    #[serde(default)]
    pub config_id: i64,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inventory: Option<i64>,
    #[serde(default)]
    pub sales_group: Option<serde_json::Value>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Hotel identity block of the configuration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HotelInfo {
    #[serde(default)]
    pub hotel_id: Option<i64>,
    pub hotel_code: String,
    #[serde(default)]
    pub hotel_name: String,
    #[serde(default)]
    pub hotel_date: Option<String>,
    #[serde(default)]
    pub local_time: Option<String>,
}

/// `GET /ExternalRms/Config` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HotelConfigResponse {
    #[serde(default)]
    pub config_info: Vec<ConfigItem>,
    pub hotel_info: HotelInfo,
}

/// A single charge line of a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceItem {
    pub sales_group: i64,
    #[serde(default)]
    pub sales_group_desc: String,
    pub date: String,
    #[serde(default)]
    pub charge: String,
    pub amount: f64,
}

/// One reservation detail as returned by `GET /ExternalRms/Reservation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostReservation {
    pub res_no: i64,
    pub res_id: i64,
    #[serde(default)]
    pub detail_id: i64,
    #[serde(default)]
    pub master_detail: i64,
    pub global_res_guest_id: i64,
    pub created_on: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(default = "default_rooms")]
    pub rooms: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    pub res_status: i64,
    #[serde(default)]
    pub pax: i64,
    #[serde(default)]
    pub pack: Option<String>,
    #[serde(default)]
    pub price_list: Option<String>,
    #[serde(default)]
    pub segment_description: Option<String>,
    #[serde(default)]
    pub sub_segment_description: Option<String>,
    #[serde(default)]
    pub channel_description: Option<String>,
    #[serde(default)]
    pub prices: Vec<PriceItem>,
    #[serde(default)]
    pub total_rows: Option<i64>,
}

fn default_rooms() -> i64 {
    1
}

/// `GET /ExternalRms/Reservation` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    #[serde(rename = "Reservations", default)]
    pub reservations: Vec<HostReservation>,
}

/// One day of availability for a room type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInventory {
    pub date: String,
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub inventory: i64,
    #[serde(rename = "inventoryOOI", default)]
    pub inventory_ooi: Option<i64>,
    #[serde(rename = "inventoryOOO", default)]
    pub inventory_ooo: Option<i64>,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Availability rows for one room type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInventory {
    pub room_code: String,
    #[serde(default)]
    pub daily_inventories: Vec<DailyInventory>,
}

/// `GET /Pms/InventoryGrid` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    #[serde(default)]
    pub hotel_code: Option<String>,
    #[serde(default)]
    pub room_inventories: Vec<RoomInventory>,
}

/// A posted revenue transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RevenueTransaction {
    #[serde(default)]
    pub transaction_id: Option<serde_json::Value>,
    #[serde(default)]
    pub res_no: Option<i64>,
    pub date: String,
    #[serde(default)]
    pub charge: String,
    pub sales_group: i64,
    #[serde(default)]
    pub sales_group_desc: String,
    pub amount: f64,
    #[serde(default)]
    pub total_rows: Option<i64>,
}

/// `GET /ExternalRms/Revenue` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueResponse {
    #[serde(rename = "revenue", default)]
    pub revenue: Vec<RevenueTransaction>,
}

/// One `GET /ExternalRms/StatDaily` row.
///
/// A reservation day usually comes as several rows: occupancy rows carry
/// room nights and pax, revenue rows carry one charge code each.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatDailyRecord {
    pub record_type: String,
    pub hotel_date: String,
    pub res_no: i64,
    pub res_id: i64,
    #[serde(default)]
    pub master_detail: i64,
    pub global_res_guest_id: i64,
    pub created_on: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub cro: Option<String>,
    #[serde(rename = "Groupname", default)]
    pub group_name: Option<String>,
    pub res_status: i64,
    #[serde(default)]
    pub pack: Option<String>,
    #[serde(default)]
    pub price_list: Option<String>,
    #[serde(default)]
    pub segment_description: Option<String>,
    #[serde(default)]
    pub sub_segment_description: Option<String>,
    #[serde(default)]
    pub channel_description: Option<String>,
    #[serde(default)]
    pub pax: i64,
    #[serde(default)]
    pub room_nights: i64,
    #[serde(default)]
    pub charge_code: Option<String>,
    #[serde(default)]
    pub revenue_gross: f64,
    #[serde(default)]
    pub revenue_net: f64,
}

impl StatDailyRecord {
    pub fn is_occupancy(&self) -> bool {
        matches!(
            self.record_type.as_str(),
            "HISTORY-OCCUPANCY" | "FORECAST-OCCUPANCY"
        )
    }

    pub fn is_revenue(&self) -> bool {
        matches!(self.record_type.as_str(), "HISTORY-REVENUE" | "FORECAST-REVENUE")
    }
}
