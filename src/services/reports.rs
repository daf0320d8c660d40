//! Aggregate views over the order book for the admin dashboard.
//!
//! Every report is a snapshot of the maps at query time. Revenue only counts
//! orders that are both paid and delivered.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, Operation};
use crate::error::AppError;
use crate::models::money::Money;
use crate::models::order::{DeliveryOrder, DeliveryType, OrderStatus, PackageType};
use crate::state::AppState;

pub const DEFAULT_REPORT_DAYS: u32 = 30;
const MAX_REPORT_DAYS: u32 = 366;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_orders: usize,
    pub by_status: Vec<StatusCount>,
    pub total_revenue: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyOrders {
    pub date: NaiveDate,
    pub count: usize,
    pub revenue: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffOrders {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub count: usize,
    pub revenue: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOrders<K> {
    pub key: K,
    pub label: &'static str,
    pub count: usize,
    pub revenue: Money,
}

#[derive(Default)]
struct Tally {
    count: usize,
    revenue: Money,
}

impl Tally {
    fn add(&mut self, order: &DeliveryOrder) {
        self.count += 1;
        self.revenue += earned(order);
    }
}

fn earned(order: &DeliveryOrder) -> Money {
    if order.is_paid && order.status == OrderStatus::Delivered {
        order.shipping_fee
    } else {
        Money::ZERO
    }
}

fn snapshot(state: &AppState) -> Vec<DeliveryOrder> {
    state.orders.iter().map(|e| e.value().clone()).collect()
}

pub fn summary(state: &AppState, identity: &Identity) -> Result<Summary, AppError> {
    authorize(identity, Operation::ViewReports)?;
    let orders = snapshot(state);

    let by_status = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: orders.iter().filter(|o| o.status == status).count(),
        })
        .collect();

    Ok(Summary {
        total_orders: orders.len(),
        by_status,
        total_revenue: orders.iter().map(earned).sum(),
    })
}

/// One row per calendar day (UTC) ending today, including empty days.
pub fn orders_by_day(
    state: &AppState,
    identity: &Identity,
    days: u32,
) -> Result<Vec<DailyOrders>, AppError> {
    authorize(identity, Operation::ViewReports)?;
    daily_rows(&snapshot(state), days, Utc::now())
}

fn daily_rows(
    orders: &[DeliveryOrder],
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DailyOrders>, AppError> {
    if days == 0 || days > MAX_REPORT_DAYS {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_REPORT_DAYS}"
        )));
    }

    let first = now.date_naive() - Duration::days(i64::from(days) - 1);
    let mut buckets: BTreeMap<NaiveDate, Tally> = (0..days)
        .map(|offset| (first + Duration::days(i64::from(offset)), Tally::default()))
        .collect();

    for order in orders {
        if let Some(tally) = buckets.get_mut(&order.created_at.date_naive()) {
            tally.add(order);
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(date, tally)| DailyOrders {
            date,
            count: tally.count,
            revenue: tally.revenue,
        })
        .collect())
}

/// Orders per assigned staff member, busiest first.
///
/// Deleting a roster entry keeps the id on its orders, so those rows are
/// reported under the name `"-"`.
pub fn orders_by_staff(state: &AppState, identity: &Identity) -> Result<Vec<StaffOrders>, AppError> {
    authorize(identity, Operation::ViewReports)?;

    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for order in snapshot(state) {
        if let Some(staff_id) = order.assigned_staff_id {
            tallies.entry(staff_id).or_default().add(&order);
        }
    }

    let mut rows: Vec<StaffOrders> = tallies
        .into_iter()
        .map(|(staff_id, tally)| StaffOrders {
            staff_id,
            staff_name: state
                .staff
                .get(&staff_id)
                .map(|s| s.full_name.clone())
                .unwrap_or_else(|| "-".to_string()),
            count: tally.count,
            revenue: tally.revenue,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.staff_name.cmp(&b.staff_name)));
    Ok(rows)
}

pub fn orders_by_delivery_type(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<CategoryOrders<DeliveryType>>, AppError> {
    authorize(identity, Operation::ViewReports)?;
    let orders = snapshot(state);

    Ok(DeliveryType::ALL
        .into_iter()
        .filter_map(|kind| {
            let mut tally = Tally::default();
            orders
                .iter()
                .filter(|o| o.goods.delivery_type == kind)
                .for_each(|o| tally.add(o));
            (tally.count > 0).then(|| CategoryOrders {
                key: kind,
                label: kind.label(),
                count: tally.count,
                revenue: tally.revenue,
            })
        })
        .collect())
}

/// Orders per package category, most common first.
pub fn orders_by_package_type(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<CategoryOrders<PackageType>>, AppError> {
    authorize(identity, Operation::ViewReports)?;
    let orders = snapshot(state);

    let mut rows: Vec<CategoryOrders<PackageType>> = PackageType::ALL
        .into_iter()
        .filter_map(|kind| {
            let mut tally = Tally::default();
            orders
                .iter()
                .filter(|o| o.goods.package_type == kind)
                .for_each(|o| tally.add(o));
            (tally.count > 0).then(|| CategoryOrders {
                key: kind,
                label: kind.label(),
                count: tally.count,
                revenue: tally.revenue,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(rows)
}
