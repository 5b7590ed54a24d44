//! Inventory transform.

use crate::error::{AppError, Result};
use crate::models::source::InventoryResponse;
use crate::models::{InventoryRecord, RawPayload, RoomInventoryData};
use crate::transform::decode;
use crate::utils::time::{date_part, open_range};

/// One record per room-day, keyed by an open-ended `[date,)` range.
pub fn transform_inventory(raw: &RawPayload) -> Result<RoomInventoryData> {
    let response: InventoryResponse = decode(raw)?;

    let mut records = Vec::new();
    for room in &response.room_inventories {
        for day in &room.daily_inventories {
            let date = date_part(&day.date).ok_or_else(|| {
                AppError::validation(format!(
                    "[{}] inventory date '{}' for room {} is not a date",
                    raw.hotel_key, day.date, room.room_code
                ))
            })?;

            records.push(InventoryRecord {
                calendar_date: open_range(date),
                inventory: day.inventory,
                inventory_ooo: day.inventory_ooo.unwrap_or(0),
                inventory_ooi: day.inventory_ooi.unwrap_or(0),
                room_code: day
                    .room_code
                    .clone()
                    .filter(|code| !code.is_empty())
                    .unwrap_or_else(|| room.room_code.clone()),
            });
        }
    }

    records.sort_by(|a, b| {
        a.room_code
            .cmp(&b.room_code)
            .then_with(|| a.calendar_date.cmp(&b.calendar_date))
    });

    log::info!("[{}] Inventory: {} room-days", raw.hotel_key, records.len());

    Ok(RoomInventoryData {
        room_inventory: records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataKind;
    use crate::transform::testing::{inventory_body, payload};
    use serde_json::json;

    #[test]
    fn test_single_room_day() {
        let out = transform_inventory(&payload(DataKind::Inventory, inventory_body())).unwrap();

        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({
                "roomInventory": [{
                    "calendarDate": "[2021-02-02,)",
                    "inventory": 1,
                    "inventoryOOO": 0,
                    "inventoryOOI": 0,
                    "roomCode": "D"
                }]
            })
        );
    }

    #[test]
    fn test_sorted_by_room_then_date_with_defaults() {
        let raw = payload(
            DataKind::Inventory,
            json!({
                "roomInventories": [
                    {"roomCode": "S", "dailyInventories": [
                        {"date": "2021-02-03T00:00:00", "inventory": 2, "inventoryOOO": 1}
                    ]},
                    {"roomCode": "D", "dailyInventories": [
                        {"date": "2021-02-03", "inventory": 4},
                        {"date": "2021-02-02", "inventory": 5, "inventoryOOI": 1, "rate": 89.0}
                    ]}
                ]
            }),
        );

        let out = transform_inventory(&raw).unwrap();
        let keys: Vec<(&str, &str)> = out
            .room_inventory
            .iter()
            .map(|r| (r.room_code.as_str(), r.calendar_date.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("D", "[2021-02-02,)"),
                ("D", "[2021-02-03,)"),
                ("S", "[2021-02-03,)"),
            ]
        );
        assert_eq!(out.room_inventory[0].inventory_ooi, 1);
        assert_eq!(out.room_inventory[1].inventory_ooo, 0);
        assert_eq!(out.room_inventory[2].inventory_ooo, 1);
    }

    #[test]
    fn test_bad_date_is_validation_error() {
        let raw = payload(
            DataKind::Inventory,
            json!({"roomInventories": [{"roomCode": "D", "dailyInventories": [{"date": "n/a"}]}]}),
        );
        assert!(matches!(
            transform_inventory(&raw),
            Err(AppError::Validation(_))
        ));
    }
}
