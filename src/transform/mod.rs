//! Raw-to-canonical transforms.
//!
//! Every function here is pure: the same raw payload and hotel profile always
//! produce the same artifact, which is what makes re-running a hotel safe.
//!
//! - `config`: hotel document, segment catalog, status codes
//! - `segment`: catalog lookup with the `UNASSIGNED` fallback
//! - `reservation`: one record per stay date
//! - `stat_daily`: one record per reservation day from StatDaily rows
//! - `revenue`: room-revenue transactions only
//! - `inventory`: per room-day availability

pub mod config;
pub mod inventory;
pub mod reservation;
pub mod revenue;
pub mod segment;
pub mod stat_daily;

use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{
    CanonicalArtifact, CanonicalBody, DataKind, RawBundle, RawPayload, ReservationCollection,
    TransformConfig,
};

pub use config::{HotelProfile, transform_config};
pub use inventory::transform_inventory;
pub use reservation::{StatusMap, transform_reservations};
pub use revenue::{ROOM_SALES_GROUP, transform_revenue};
pub use segment::SegmentCatalog;
pub use stat_daily::transform_stat_daily;

/// Read a raw body into its typed view; shape mismatches are validation errors.
pub(crate) fn decode<T: DeserializeOwned>(raw: &RawPayload) -> Result<T> {
    T::deserialize(&raw.body).map_err(|e| {
        AppError::validation(format!(
            "[{}] malformed {} payload: {}",
            raw.hotel_key, raw.kind, e
        ))
    })
}

/// Produce every processed artifact of a run, in registration order.
pub fn transform_all(bundle: &RawBundle, rules: &TransformConfig) -> Result<Vec<CanonicalArtifact>> {
    let hotel_key = bundle.config.hotel_key.as_str();

    let profile = transform_config(&bundle.config)?;
    let reservations = reservations_from(&bundle.reservations, &profile, rules)?;
    let inventory = transform_inventory(&bundle.inventory)?;
    let revenue = transform_revenue(&bundle.revenue)?;

    Ok(vec![
        CanonicalArtifact::new(hotel_key, CanonicalBody::Config(profile.config.clone())),
        CanonicalArtifact::new(
            hotel_key,
            CanonicalBody::Segments(profile.catalog.collection().clone()),
        ),
        CanonicalArtifact::new(hotel_key, CanonicalBody::Reservations(reservations)),
        CanonicalArtifact::new(hotel_key, CanonicalBody::Inventory(inventory)),
        CanonicalArtifact::new(hotel_key, CanonicalBody::Revenue(revenue)),
    ])
}

/// Reservations document from whichever source the payload came from.
fn reservations_from(
    raw: &RawPayload,
    profile: &HotelProfile,
    rules: &TransformConfig,
) -> Result<ReservationCollection> {
    match raw.kind {
        DataKind::Reservations => transform_reservations(raw, profile, rules),
        DataKind::StatDaily => transform_stat_daily(raw, profile),
        other => Err(AppError::validation(format!(
            "[{}] {} is not a reservation source",
            raw.hotel_key, other
        ))),
    }
}

/// Transform a single raw payload, as the offline `transform` command does.
///
/// Reservations need the hotel's config payload for statuses and segments.
/// A config payload yields both the config and the segments artifacts.
pub fn transform_one(
    raw: &RawPayload,
    config: Option<&RawPayload>,
    rules: &TransformConfig,
) -> Result<Vec<CanonicalArtifact>> {
    let hotel_key = raw.hotel_key.as_str();
    let body = match raw.kind {
        DataKind::Config => {
            let profile = transform_config(raw)?;
            return Ok(vec![
                CanonicalArtifact::new(hotel_key, CanonicalBody::Config(profile.config.clone())),
                CanonicalArtifact::new(
                    hotel_key,
                    CanonicalBody::Segments(profile.catalog.collection().clone()),
                ),
            ]);
        }
        DataKind::Reservations | DataKind::StatDaily => {
            let config = config.ok_or_else(|| {
                AppError::validation("reservations need the hotel config payload")
            })?;
            let profile = transform_config(config)?;
            CanonicalBody::Reservations(reservations_from(raw, &profile, rules)?)
        }
        DataKind::Inventory => CanonicalBody::Inventory(transform_inventory(raw)?),
        DataKind::Revenue => CanonicalBody::Revenue(transform_revenue(raw)?),
    };
    Ok(vec![CanonicalArtifact::new(hotel_key, body)])
}

/// Shared raw fixtures.
#[cfg(test)]
pub(crate) mod testing {
    use serde_json::{Value, json};

    use crate::models::{DataKind, RawBundle, RawPayload, SyncWindow};
    use crate::utils::time::{beginning_of_time, parse_timestamp};

    pub fn window() -> SyncWindow {
        SyncWindow {
            from: beginning_of_time(),
            to: parse_timestamp("2024-07-04T10:00:00Z").unwrap(),
        }
    }

    pub fn payload(kind: DataKind, body: Value) -> RawPayload {
        RawPayload::new(kind, "H1", window(), body)
    }

    pub fn config_body() -> Value {
        json!({
            "ConfigInfo": [
                {"ConfigType": "CATEGORY", "ConfigId": 1, "Code": "D", "Description": "Double", "Inventory": 10, "Active": true},
                {"ConfigType": "CATEGORY", "ConfigId": 2, "Code": "S", "Description": "Suite", "Inventory": 2, "Active": true},
                {"ConfigType": "SEGMENT", "ConfigId": 3, "Code": "COR", "Description": "Corporate", "Active": true},
                {"ConfigType": "SEGMENT", "ConfigId": 4, "Code": "OLD", "Description": "Retired", "Active": false},
                {"ConfigType": "SUB-SEGMENT", "ConfigId": 5, "Code": "CORL", "Description": "Corporate Local", "Active": true},
                {"ConfigType": "DIST CHANNEL", "ConfigId": 6, "Code": "DIR", "Description": "Direct", "Active": true},
                {"ConfigType": "PACKAGE", "ConfigId": 7, "Code": "BB", "Description": "Bed and Breakfast", "Active": true},
                {"ConfigType": "PRICELIST", "ConfigId": 8, "Code": "BAR", "Description": "Best Available", "Active": true},
                {"ConfigType": "CHARGE", "ConfigId": 9, "Code": "ALOJ", "Description": "Accommodation", "SalesGroup": "0", "Active": true},
                {"ConfigType": "RESERVATION STATUS", "ConfigId": 6, "Code": "CXL", "Description": "Cancelled", "Active": true},
                {"ConfigType": "RESERVATION STATUS", "ConfigId": 7, "Code": "NOSHOW", "Description": "No show", "Active": true},
                {"ConfigType": "RESERVATION STATUS", "ConfigId": 10, "Code": "CI", "Description": "Checked in", "Active": true}
            ],
            "HotelInfo": {
                "HotelId": 1,
                "HotelCode": "H1",
                "HotelName": "Hotel One",
                "LocalTime": "2024-07-04T09:12:00"
            }
        })
    }

    pub fn price(sales_group: i64, date: &str, amount: f64) -> Value {
        json!({
            "SalesGroup": sales_group,
            "SalesGroupDesc": "",
            "Date": format!("{date}T00:00:00"),
            "Charge": "ALOJ",
            "Amount": amount
        })
    }

    pub fn reservation(res_no: i64, res_status: i64, prices: Vec<Value>) -> Value {
        json!({
            "ResNo": res_no,
            "ResId": res_no * 10,
            "DetailId": 1,
            "MasterDetail": 0,
            "GlobalResGuestId": 500 + res_no,
            "CreatedOn": "2024-06-01T12:00:00",
            "CheckIn": "2024-07-01T00:00:00",
            "CheckOut": "2024-07-03T00:00:00",
            "Rooms": 1,
            "Category": "D",
            "Agency": "Booking.com",
            "Company": null,
            "GroupName": null,
            "ResStatus": res_status,
            "Pax": 2,
            "Pack": "BB",
            "PriceList": "BAR",
            "SegmentDescription": "Corporate",
            "SubSegmentDescription": "Unknown Sub",
            "ChannelDescription": "Direct",
            "Prices": prices,
            "TotalRows": 1
        })
    }

    pub fn stat_row(
        res_no: i64,
        res_status: i64,
        record_type: &str,
        day: &str,
        charge: Option<&str>,
        net: f64,
    ) -> Value {
        let occupancy = record_type.ends_with("OCCUPANCY");
        json!({
            "RowNumber": 1,
            "TotalRows": 1,
            "RecordType": record_type,
            "HotelDate": format!("{day}T00:00:00"),
            "ResNo": res_no,
            "ResId": res_no * 10,
            "DetailId": 1,
            "MasterDetail": 0,
            "GlobalResGuestId": 500 + res_no,
            "CreatedOn": "2024-06-01T12:00:00",
            "CheckIn": "2024-07-01T00:00:00",
            "CheckOut": "2024-07-03T00:00:00",
            "Category": "D",
            "Agency": null,
            "Groupname": null,
            "ResStatus": res_status,
            "Pack": "BB|RO",
            "PriceList": "BAR",
            "SegmentDescription": "Corporate",
            "ChannelDescription": "Direct",
            "Pax": 2,
            "RoomNights": if occupancy { 1 } else { 0 },
            "ChargeCode": charge,
            "SalesGroup": 0,
            "RevenueGross": net * 1.06,
            "RevenueNet": net
        })
    }

    pub fn inventory_body() -> Value {
        json!({
            "hotelCode": "H1",
            "roomInventories": [
                {
                    "roomCode": "D",
                    "dailyInventories": [
                        {"date": "2021-02-02", "roomCode": "D", "inventory": 1, "inventoryOOO": 0, "inventoryOOI": 0}
                    ]
                }
            ]
        })
    }

    pub fn revenue_row(id: i64, sales_group: i64, amount: f64) -> Value {
        json!({
            "TransactionId": id,
            "ResNo": 100 + id,
            "Date": "2024-07-01T00:00:00",
            "Charge": if sales_group == 0 { "ALOJ" } else { "BAR" },
            "SalesGroup": sales_group,
            "SalesGroupDesc": "",
            "Amount": amount
        })
    }

    pub fn bundle() -> RawBundle {
        RawBundle {
            config: payload(DataKind::Config, config_body()),
            reservations: payload(
                DataKind::Reservations,
                json!({"Reservations": [reservation(1, 0, vec![
                    price(0, "2024-07-01", 106.0),
                    price(0, "2024-07-02", 106.0),
                ])]}),
            ),
            inventory: payload(DataKind::Inventory, inventory_body()),
            revenue: payload(
                DataKind::Revenue,
                json!({"revenue": [revenue_row(1, 0, 100.0), revenue_row(2, 1, 20.0)]}),
            ),
        }
    }
}
