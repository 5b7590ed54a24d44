//! Hotel configuration transform.
//!
//! The configuration response is the source of truth for everything else a
//! run produces: room list, segment catalog and reservation status codes.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::source::{ConfigItem, HotelConfigResponse};
use crate::models::{HotelConfigData, RawPayload, RoomConfig, SegmentCollection, SegmentItem};
use crate::transform::decode;
use crate::transform::reservation::StatusMap;
use crate::transform::segment::SegmentCatalog;
use crate::utils::time::date_part;

/// Config types and the segment category they populate.
const ROOM_TYPE: &str = "CATEGORY";
const SEGMENT_TYPE: &str = "SEGMENT";
const SUB_SEGMENT_TYPE: &str = "SUB-SEGMENT";
const CHANNEL_TYPE: &str = "DIST CHANNEL";
const PACKAGE_TYPE: &str = "PACKAGE";
const PRICE_LIST_TYPE: &str = "PRICELIST";
const STATUS_TYPE: &str = "RESERVATION STATUS";
const CHARGE_TYPE: &str = "CHARGE";

/// Room charge codes assumed when the configuration lists none.
pub const DEFAULT_ROOM_CHARGES: [&str; 3] = ["ALOJ", "OB", "TXCANCEL"];

/// Everything the other transforms need to know about a hotel.
#[derive(Debug, Clone)]
pub struct HotelProfile {
    pub config: HotelConfigData,
    pub catalog: SegmentCatalog,
    pub statuses: StatusMap,
    /// Business date reported by the PMS, if any
    pub hotel_date: Option<NaiveDate>,
    /// Charge codes counted as room revenue in StatDaily rows
    pub room_charges: BTreeSet<String>,
}

/// Map the raw configuration into the hotel document and its catalog.
///
/// Unknown config types are ignored; unknown codes inside known types are
/// carried through unchanged.
pub fn transform_config(raw: &RawPayload) -> Result<HotelProfile> {
    let response: HotelConfigResponse = decode(raw)?;
    let info = &response.hotel_info;

    let rooms: Vec<RoomConfig> = of_type(&response.config_info, ROOM_TYPE)
        .map(|item| RoomConfig {
            code: item.code.clone(),
            name: item.description.clone(),
            capacity: item.inventory.unwrap_or(0),
            category: item.code.clone(),
        })
        .collect();

    let config = HotelConfigData {
        hotel_code: info.hotel_code.clone(),
        hotel_name: info.hotel_name.clone(),
        room_count: rooms.len() as i64,
        rooms,
    };

    let segments = |config_type: &str| -> Vec<SegmentItem> {
        of_type(&response.config_info, config_type)
            .map(|item| SegmentItem::new(&item.code, &item.description, item.active))
            .collect()
    };

    let collection = SegmentCollection {
        channels: segments(CHANNEL_TYPE),
        packages: segments(PACKAGE_TYPE),
        rates: segments(PRICE_LIST_TYPE),
        rooms: segments(ROOM_TYPE),
        segments: segments(SEGMENT_TYPE),
        sub_segments: segments(SUB_SEGMENT_TYPE),
        ..SegmentCollection::default()
    };

    let statuses = StatusMap::from_config(of_type(&response.config_info, STATUS_TYPE));

    let hotel_date = info
        .local_time
        .as_deref()
        .or(info.hotel_date.as_deref())
        .and_then(date_part);

    log::info!(
        "[{}] Config: {} rooms, {} catalog entries",
        raw.hotel_key,
        config.room_count,
        collection.len()
    );

    Ok(HotelProfile {
        config,
        catalog: SegmentCatalog::new(collection),
        statuses,
        hotel_date,
        room_charges: room_charges(&response.config_info),
    })
}

/// `CHARGE` items in the room sales group, by their `SalesGroup` name or number.
fn room_charges(items: &[ConfigItem]) -> BTreeSet<String> {
    let codes: BTreeSet<String> = of_type(items, CHARGE_TYPE)
        .filter(|item| match &item.sales_group {
            Some(serde_json::Value::String(group)) => {
                let group = group.trim();
                group.eq_ignore_ascii_case("ROOM") || group == "0"
            }
            Some(serde_json::Value::Number(group)) => group.as_i64() == Some(0),
            _ => false,
        })
        .map(|item| item.code.trim().to_string())
        .filter(|code| !code.is_empty())
        .collect();

    if codes.is_empty() {
        DEFAULT_ROOM_CHARGES.iter().map(|c| c.to_string()).collect()
    } else {
        codes
    }
}

fn of_type<'a>(
    items: &'a [ConfigItem],
    config_type: &'a str,
) -> impl Iterator<Item = &'a ConfigItem> + 'a {
    items
        .iter()
        .filter(move |item| item.config_type.trim() == config_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataKind, ReservationStatus, SegmentKind, UNASSIGNED};
    use crate::transform::testing::{config_body, payload};
    use serde_json::json;

    #[test]
    fn test_rooms_and_segments() {
        let profile = transform_config(&payload(DataKind::Config, config_body())).unwrap();

        assert_eq!(profile.config.hotel_code, "H1");
        assert_eq!(profile.config.hotel_name, "Hotel One");
        assert_eq!(profile.config.room_count, 2);
        assert_eq!(profile.config.rooms[0].code, "D");
        assert_eq!(profile.config.rooms[0].capacity, 10);
        assert_eq!(profile.config.rooms[0].category, "D");

        let segments = profile.catalog.collection();
        assert_eq!(segments.segments[0].code, "COR");
        assert_eq!(segments.segments[0].position, 9999);
        assert_eq!(segments.sub_segments[0].code, "CORL");
        assert_eq!(segments.channels[0].code, "DIR");
        assert_eq!(segments.packages[0].code, "BB");
        assert_eq!(segments.rates[0].code, "BAR");
        // Config never provides these; they only hold the fallback
        assert_eq!(segments.agencies.len(), 1);
        assert_eq!(segments.agencies[0].code, UNASSIGNED);

        assert_eq!(
            profile.hotel_date,
            NaiveDate::from_ymd_opt(2024, 7, 4)
        );
    }

    #[test]
    fn test_inactive_items_keep_flags() {
        let profile = transform_config(&payload(DataKind::Config, config_body())).unwrap();
        let inactive = profile
            .catalog
            .resolve(SegmentKind::Segment, Some("OLD"));
        assert_eq!(inactive.code, "OLD");
        assert!(!inactive.enabled_otb);
        assert!(!inactive.enabled_revenue);
    }

    #[test]
    fn test_status_catalog_from_config() {
        let profile = transform_config(&payload(DataKind::Config, config_body())).unwrap();
        assert_eq!(profile.statuses.resolve(6), ReservationStatus::Cancelled);
        assert_eq!(profile.statuses.resolve(10), ReservationStatus::CheckedIn);
    }

    #[test]
    fn test_room_charges_from_config() {
        let profile = transform_config(&payload(DataKind::Config, config_body())).unwrap();
        assert_eq!(profile.room_charges.iter().collect::<Vec<_>>(), vec!["ALOJ"]);

        let mut body = config_body();
        body["ConfigInfo"] = json!([
            {"ConfigType": "CHARGE", "Code": "ALOJ", "SalesGroup": "ROOM"},
            {"ConfigType": "CHARGE", "Code": "UPG", "SalesGroup": "room"},
            {"ConfigType": "CHARGE", "Code": "PA", "SalesGroup": "F&B"}
        ]);
        let profile = transform_config(&payload(DataKind::Config, body)).unwrap();
        assert_eq!(
            profile.room_charges.iter().collect::<Vec<_>>(),
            vec!["ALOJ", "UPG"]
        );

        let mut body = config_body();
        body["ConfigInfo"] = json!([]);
        let profile = transform_config(&payload(DataKind::Config, body)).unwrap();
        assert_eq!(
            profile.room_charges.iter().collect::<Vec<_>>(),
            vec!["ALOJ", "OB", "TXCANCEL"]
        );
    }

    #[test]
    fn test_missing_hotel_info_is_validation_error() {
        let err = transform_config(&payload(DataKind::Config, json!({"ConfigInfo": []})))
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Validation(_)));
    }
}
