//! StatDaily reservation transform.
//!
//! StatDaily rows are grouped per reservation day, keyed by
//! `(ResNo, GlobalResGuestId, ResId, HotelDate)`. Occupancy rows give room
//! nights and pax; revenue rows give net room revenue for the hotel's room
//! charge codes plus no-show charges. Every other charge is dropped.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::source::StatDailyRecord;
use crate::models::{
    RawPayload, ReservationCollection, ReservationRecord, ReservationStatus, SegmentKind,
};
use crate::transform::config::HotelProfile;
use crate::transform::reservation::external_reference;
use crate::utils::time::{date_part, open_range};

/// Charge codes that mark a no-show day. Counted as room revenue.
pub const NO_SHOW_CHARGES: [&str; 1] = ["NOSHOW"];

type DayKey = (i64, i64, i64, String);

/// Build the reservations document from a StatDaily payload.
///
/// Rows that do not decode are logged and skipped; a body that is not a list
/// is a validation error.
pub fn transform_stat_daily(
    raw: &RawPayload,
    profile: &HotelProfile,
) -> Result<ReservationCollection> {
    let Value::Array(rows) = &raw.body else {
        return Err(AppError::validation(format!(
            "[{}] malformed {} payload: expected a list",
            raw.hotel_key, raw.kind
        )));
    };

    let mut groups: BTreeMap<DayKey, Vec<StatDailyRecord>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        let record = match StatDailyRecord::deserialize(row) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("[{}] Skipping StatDaily row: {}", raw.hotel_key, e);
                skipped += 1;
                continue;
            }
        };
        let Some(day) = date_part(&record.hotel_date) else {
            log::warn!(
                "[{}] Skipping StatDaily row with HotelDate '{}'",
                raw.hotel_key,
                record.hotel_date
            );
            skipped += 1;
            continue;
        };
        let key = (
            record.res_no,
            record.global_res_guest_id,
            record.res_id,
            day.to_string(),
        );
        groups.entry(key).or_default().push(record);
    }

    let record_anchor = profile
        .hotel_date
        .unwrap_or_else(|| raw.window.to.date_naive());

    let mut records = Vec::with_capacity(groups.len());
    for ((_, _, _, day), group) in &groups {
        records.push(reservation_day(day, group, profile, &open_range(record_anchor))?);
    }

    records.sort_by(|a, b| {
        a.reservation_id_external
            .cmp(&b.reservation_id_external)
            .then_with(|| a.calendar_date.cmp(&b.calendar_date))
    });

    log::info!(
        "[{}] StatDaily: {} rows ({} skipped) -> {} reservation days",
        raw.hotel_key,
        rows.len(),
        skipped,
        records.len()
    );

    Ok(ReservationCollection {
        reservations: records,
    })
}

fn reservation_day(
    day: &str,
    group: &[StatDailyRecord],
    profile: &HotelProfile,
    record_date: &str,
) -> Result<ReservationRecord> {
    let occupancy: Vec<&StatDailyRecord> = group.iter().filter(|r| r.is_occupancy()).collect();
    let revenue: Vec<&StatDailyRecord> = group
        .iter()
        .filter(|r| r.is_revenue())
        .filter(|r| {
            r.charge_code
                .as_deref()
                .is_some_and(|code| profile.room_charges.contains(code) || is_no_show(code))
        })
        .collect();

    // Groups are never empty: they are built by pushing rows
    let base = occupancy
        .first()
        .or_else(|| revenue.first())
        .copied()
        .unwrap_or(&group[0]);

    let external_id =
        external_reference(base.res_no, base.global_res_guest_id, base.master_detail);
    let parse = |field: &str, value: &str| {
        date_part(value).ok_or_else(|| {
            AppError::validation(format!(
                "reservation {external_id}: {field} '{value}' is not a date"
            ))
        })
    };
    let check_in = parse("CheckIn", &base.check_in)?;
    let check_out = parse("CheckOut", &base.check_out)?;
    let created = parse("CreatedOn", &base.created_on)?;

    let mut rooms: i64 = occupancy.iter().map(|r| r.room_nights).sum();
    let pax: i64 = occupancy.iter().map(|r| r.pax).sum();
    let mut revenue_room: f64 = revenue.iter().map(|r| r.revenue_net).sum();
    let no_show = revenue
        .iter()
        .any(|r| r.charge_code.as_deref().is_some_and(is_no_show));

    let status = if no_show {
        ReservationStatus::NoShow
    } else {
        profile.statuses.resolve(base.res_status)
    };
    if status == ReservationStatus::Cancelled {
        rooms = 0;
        revenue_room = 0.0;
    }

    let catalog = &profile.catalog;
    let code = |kind: SegmentKind, reference: Option<&str>| catalog.code(kind, reference);
    let room_reference = occupancy.first().and_then(|r| r.category.as_deref());
    let package = base
        .pack
        .as_deref()
        .and_then(|pack| pack.split('|').next());

    Ok(ReservationRecord {
        record_date: record_date.to_string(),
        calendar_date: day.to_string(),
        calendar_date_start: check_in.to_string(),
        calendar_date_end: check_out.to_string(),
        created_date: created.to_string(),
        pax,
        reservation_id: base.res_id.to_string(),
        reservation_id_external: external_id.clone(),
        revenue_fb: 0.0,
        revenue_fb_invoice: 0.0,
        revenue_others: 0.0,
        revenue_others_invoice: 0.0,
        revenue_room,
        revenue_room_invoice: revenue_room,
        rooms,
        status: status.code(),
        agency_code: code(SegmentKind::Agency, base.agency.as_deref()),
        channel_code: code(SegmentKind::Channel, base.channel_description.as_deref()),
        company_code: code(SegmentKind::Company, base.company.as_deref()),
        cro_code: code(SegmentKind::Cro, base.cro.as_deref()),
        group_code: code(SegmentKind::Group, base.group_name.as_deref()),
        package_code: code(SegmentKind::Package, package),
        rate_code: code(SegmentKind::Rate, base.price_list.as_deref()),
        room_code: code(SegmentKind::Room, room_reference),
        segment_code: code(SegmentKind::Segment, base.segment_description.as_deref()),
        sub_segment_code: code(
            SegmentKind::SubSegment,
            base.sub_segment_description.as_deref(),
        ),
    })
}

fn is_no_show(code: &str) -> bool {
    NO_SHOW_CHARGES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataKind, UNASSIGNED};
    use crate::transform::config::transform_config;
    use crate::transform::testing::{config_body, payload, stat_row};
    use serde_json::json;

    fn profile() -> HotelProfile {
        transform_config(&payload(DataKind::Config, config_body())).unwrap()
    }

    fn run(rows: Vec<Value>) -> ReservationCollection {
        transform_stat_daily(&payload(DataKind::StatDaily, Value::Array(rows)), &profile()).unwrap()
    }

    #[test]
    fn test_rows_group_into_reservation_days() {
        let out = run(vec![
            stat_row(1, 0, "HISTORY-OCCUPANCY", "2024-07-01", None, 0.0),
            stat_row(1, 0, "HISTORY-REVENUE", "2024-07-01", Some("ALOJ"), 100.0),
            // F&B charge is not room revenue
            stat_row(1, 0, "HISTORY-REVENUE", "2024-07-01", Some("PA"), 20.0),
            stat_row(1, 0, "FORECAST-OCCUPANCY", "2024-07-02", None, 0.0),
            stat_row(1, 0, "FORECAST-REVENUE", "2024-07-02", Some("ALOJ"), 90.0),
        ]);

        assert_eq!(out.reservations.len(), 2);
        let first = &out.reservations[0];
        assert_eq!(first.calendar_date, "2024-07-01");
        assert_eq!(first.calendar_date_start, "2024-07-01");
        assert_eq!(first.calendar_date_end, "2024-07-03");
        assert_eq!(first.reservation_id_external, "1-501");
        assert_eq!(first.reservation_id, "10");
        assert_eq!(first.revenue_room, 100.0);
        assert_eq!(first.revenue_room_invoice, 100.0);
        assert_eq!(first.revenue_fb, 0.0);
        assert_eq!(first.rooms, 1);
        assert_eq!(first.pax, 2);
        assert_eq!(first.status, ReservationStatus::Confirmed.code());
        assert_eq!(first.record_date, "[2024-07-04,)");
        assert_eq!(first.room_code, "D");
        assert_eq!(first.segment_code, "COR");
        assert_eq!(first.package_code, "BB");
        assert_eq!(first.agency_code, UNASSIGNED);

        assert_eq!(out.reservations[1].revenue_room, 90.0);
    }

    #[test]
    fn test_occupancy_rows_are_summed() {
        let mut extra = stat_row(1, 0, "HISTORY-OCCUPANCY", "2024-07-01", None, 0.0);
        extra["RoomNights"] = json!(2);
        extra["Pax"] = json!(3);
        let out = run(vec![
            stat_row(1, 0, "HISTORY-OCCUPANCY", "2024-07-01", None, 0.0),
            extra,
        ]);
        assert_eq!(out.reservations.len(), 1);
        assert_eq!(out.reservations[0].rooms, 3);
        assert_eq!(out.reservations[0].pax, 5);
    }

    #[test]
    fn test_no_show_charge_sets_status() {
        let out = run(vec![
            stat_row(1, 0, "HISTORY-OCCUPANCY", "2024-07-01", None, 0.0),
            stat_row(1, 0, "HISTORY-REVENUE", "2024-07-01", Some("NOSHOW"), 50.0),
        ]);
        let record = &out.reservations[0];
        assert_eq!(record.status, ReservationStatus::NoShow.code());
        assert_eq!(record.revenue_room, 50.0);
    }

    #[test]
    fn test_cancelled_day_is_kept_with_zero_revenue() {
        let out = run(vec![
            stat_row(1, 6, "HISTORY-OCCUPANCY", "2024-07-01", None, 0.0),
            stat_row(1, 6, "HISTORY-REVENUE", "2024-07-01", Some("ALOJ"), 80.0),
        ]);
        assert_eq!(out.reservations.len(), 1);
        let record = &out.reservations[0];
        assert_eq!(record.status, ReservationStatus::Cancelled.code());
        assert_eq!(record.rooms, 0);
        assert_eq!(record.revenue_room, 0.0);
        assert_eq!(record.revenue_room_invoice, 0.0);
    }

    #[test]
    fn test_revenue_only_day_and_bad_rows() {
        let out = run(vec![
            stat_row(2, 0, "HISTORY-REVENUE", "2024-07-01", Some("ALOJ"), 40.0),
            json!({"RecordType": "HISTORY-REVENUE"}),
        ]);
        assert_eq!(out.reservations.len(), 1);
        let record = &out.reservations[0];
        assert_eq!(record.rooms, 0);
        assert_eq!(record.room_code, UNASSIGNED);
        assert_eq!(record.revenue_room, 40.0);
    }

    #[test]
    fn test_body_must_be_a_list() {
        let err = transform_stat_daily(
            &payload(DataKind::StatDaily, json!({"records": []})),
            &profile(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
