//! Reservation transform.
//!
//! Each Host reservation detail becomes one record per date that carries a
//! price line. Charges are split by sales group and VAT is removed.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::source::{ConfigItem, HostReservation, PriceItem, ReservationResponse};
use crate::models::{
    RawPayload, ReservationCollection, ReservationRecord, ReservationStatus, SegmentKind,
    TransformConfig,
};
use crate::transform::config::HotelProfile;
use crate::transform::decode;
use crate::utils::time::{date_part, open_range};

/// Maps Host `ResStatus` values to downstream status codes.
///
/// The hotel's `RESERVATION STATUS` catalog names each id; ids it does not
/// list fall back to the standard Host numbering.
#[derive(Debug, Clone, Default)]
pub struct StatusMap {
    codes: HashMap<i64, String>,
}

impl StatusMap {
    pub fn from_config<'a>(items: impl IntoIterator<Item = &'a ConfigItem>) -> Self {
        let codes = items
            .into_iter()
            .map(|item| (item.config_id, item.code.trim().to_uppercase()))
            .collect();
        Self { codes }
    }

    pub fn resolve(&self, res_status: i64) -> ReservationStatus {
        let code = self
            .codes
            .get(&res_status)
            .map(String::as_str)
            .or_else(|| standard_code(res_status));

        match code {
            Some(code) => status_for_code(code),
            None => {
                log::warn!("Unknown reservation status {}, treating as confirmed", res_status);
                ReservationStatus::Confirmed
            }
        }
    }
}

fn standard_code(res_status: i64) -> Option<&'static str> {
    match res_status {
        0 => Some("STANDARD"),
        2 => Some("OPTION"),
        3 => Some("WAITLIST"),
        5 => Some("OOO"),
        6 => Some("CXL"),
        7 => Some("NOSHOW"),
        8 => Some("OOI"),
        10 => Some("CI"),
        20 => Some("CO"),
        _ => None,
    }
}

fn status_for_code(code: &str) -> ReservationStatus {
    match code {
        "CI" => ReservationStatus::CheckedIn,
        "CO" => ReservationStatus::CheckedOut,
        "NOSHOW" => ReservationStatus::NoShow,
        "OPTION" => ReservationStatus::Tentative,
        "CXL" | "OOI" | "OOO" | "WAITLIST" => ReservationStatus::Cancelled,
        _ => ReservationStatus::Confirmed,
    }
}

/// Net revenue of one stay date, split by sales group.
#[derive(Debug, Default, Clone, Copy)]
struct DayRevenue {
    room: f64,
    food: f64,
    other: f64,
}

impl DayRevenue {
    fn add(&mut self, item: &PriceItem, rules: &TransformConfig) {
        match item.sales_group {
            0 => self.room += item.amount / (1.0 + rules.vat_room),
            1 => self.food += item.amount / (1.0 + rules.vat_food),
            _ => self.other += item.amount / (1.0 + rules.vat_other),
        }
    }
}

/// Flatten the reservations payload into per-date records.
///
/// Output is sorted by external id then date, and a night seen twice keeps
/// its first occurrence.
pub fn transform_reservations(
    raw: &RawPayload,
    profile: &HotelProfile,
    rules: &TransformConfig,
) -> Result<ReservationCollection> {
    let response: ReservationResponse = decode(raw)?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for reservation in &response.reservations {
        for record in flatten(reservation, profile, rules)? {
            let night = (
                record.reservation_id_external.clone(),
                record.calendar_date.clone(),
            );
            if seen.insert(night) {
                records.push(record);
            } else {
                log::debug!(
                    "[{}] Skipping duplicate night {} of {}",
                    raw.hotel_key,
                    record.calendar_date,
                    record.reservation_id_external
                );
            }
        }
    }

    records.sort_by(|a, b| {
        a.reservation_id_external
            .cmp(&b.reservation_id_external)
            .then_with(|| a.calendar_date.cmp(&b.calendar_date))
    });

    log::info!(
        "[{}] Reservations: {} details -> {} stay-date records",
        raw.hotel_key,
        response.reservations.len(),
        records.len()
    );

    Ok(ReservationCollection {
        reservations: records,
    })
}

fn flatten(
    reservation: &HostReservation,
    profile: &HotelProfile,
    rules: &TransformConfig,
) -> Result<Vec<ReservationRecord>> {
    let external_id = external_id(reservation);
    let parse = |field: &str, value: &str| {
        date_part(value).ok_or_else(|| {
            AppError::validation(format!(
                "reservation {external_id}: {field} '{value}' is not a date"
            ))
        })
    };

    let status = profile.statuses.resolve(reservation.res_status);
    let cancelled = status == ReservationStatus::Cancelled;
    let no_show = status == ReservationStatus::NoShow;

    let mut by_date: BTreeMap<NaiveDate, DayRevenue> = BTreeMap::new();
    for item in &reservation.prices {
        let date = parse("price date", &item.date)?;
        by_date.entry(date).or_default().add(item, rules);
    }
    // A cancellation may arrive with its price lines already removed
    if by_date.is_empty() && cancelled {
        let check_in = parse("CheckIn", &reservation.check_in)?;
        by_date.insert(check_in, DayRevenue::default());
    }

    let (Some(first), Some(last)) = (
        by_date.keys().next().copied(),
        by_date.keys().next_back().copied(),
    ) else {
        return Ok(Vec::new());
    };

    let check_out = parse("CheckOut", &reservation.check_out)?;
    let created = parse("CreatedOn", &reservation.created_on)?;

    let record_start = match profile.hotel_date {
        Some(hotel_date) if last < hotel_date => last,
        Some(hotel_date) => hotel_date,
        None => first,
    };

    let catalog = &profile.catalog;
    let code = |kind: SegmentKind, reference: &Option<String>| {
        catalog.code(kind, reference.as_deref())
    };

    let records = by_date
        .into_iter()
        .map(|(date, revenue)| {
            // Cancelled bookings stay in the output so counts reconcile.
            let revenue = if cancelled {
                DayRevenue::default()
            } else {
                revenue
            };
            let rooms = if no_show || date >= check_out {
                0
            } else {
                reservation.rooms
            };

            ReservationRecord {
                record_date: open_range(record_start),
                calendar_date: date.to_string(),
                calendar_date_start: first.to_string(),
                calendar_date_end: last.to_string(),
                created_date: created.to_string(),
                pax: reservation.pax,
                reservation_id: reservation.res_id.to_string(),
                reservation_id_external: external_id.clone(),
                revenue_fb: revenue.food,
                revenue_fb_invoice: revenue.food,
                revenue_others: revenue.other,
                revenue_others_invoice: revenue.other,
                revenue_room: revenue.room,
                revenue_room_invoice: if no_show { 0.0 } else { revenue.room },
                rooms,
                status: status.code(),
                agency_code: code(SegmentKind::Agency, &reservation.agency),
                channel_code: code(SegmentKind::Channel, &reservation.channel_description),
                company_code: code(SegmentKind::Company, &reservation.company),
                cro_code: code(SegmentKind::Cro, &None),
                group_code: code(SegmentKind::Group, &reservation.group_name),
                package_code: code(SegmentKind::Package, &reservation.pack),
                rate_code: code(SegmentKind::Rate, &reservation.price_list),
                room_code: code(SegmentKind::Room, &reservation.category),
                segment_code: code(SegmentKind::Segment, &reservation.segment_description),
                sub_segment_code: code(
                    SegmentKind::SubSegment,
                    &reservation.sub_segment_description,
                ),
            }
        })
        .collect();

    Ok(records)
}

fn external_id(reservation: &HostReservation) -> String {
    external_reference(
        reservation.res_no,
        reservation.global_res_guest_id,
        reservation.master_detail,
    )
}

/// `ResNo-GlobalResGuestId`, plus `-MasterDetail` for child details.
pub(crate) fn external_reference(res_no: i64, global_res_guest_id: i64, master_detail: i64) -> String {
    if master_detail > 0 {
        format!("{res_no}-{global_res_guest_id}-{master_detail}")
    } else {
        format!("{res_no}-{global_res_guest_id}")
    }
}
