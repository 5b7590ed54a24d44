//! Revenue transform.
//!
//! Only room revenue (sales group 0) is loaded. Ancillary groups are
//! excluded on purpose; the downstream computes room KPIs from this file.

use crate::error::{AppError, Result};
use crate::models::source::{RevenueResponse, RevenueTransaction};
use crate::models::{RawPayload, RevenueData, RevenueRecord};
use crate::transform::decode;
use crate::utils::time::date_part;

/// The sales group holding room revenue.
pub const ROOM_SALES_GROUP: i64 = 0;

/// Keep room-revenue transactions, amounts untouched.
pub fn transform_revenue(raw: &RawPayload) -> Result<RevenueData> {
    let response: RevenueResponse = decode(raw)?;
    let total = response.revenue.len();

    let revenue = response
        .revenue
        .iter()
        .filter(|tx| tx.sales_group == ROOM_SALES_GROUP)
        .map(to_record)
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "[{}] Revenue: kept {} of {} transactions",
        raw.hotel_key,
        revenue.len(),
        total
    );

    Ok(RevenueData { revenue })
}

fn to_record(tx: &RevenueTransaction) -> Result<RevenueRecord> {
    let date = date_part(&tx.date).ok_or_else(|| {
        AppError::validation(format!("revenue transaction date '{}' is not a date", tx.date))
    })?;

    Ok(RevenueRecord {
        transaction_id: tx.transaction_id.as_ref().map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        reservation_id: tx.res_no.map(|n| n.to_string()),
        calendar_date: date.to_string(),
        charge_code: tx.charge.clone(),
        sales_group: tx.sales_group,
        amount: tx.amount,
    })
}
