use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{DeliveryOrder, NoteLine, OrderStatus};

/// Forward edges of the delivery lifecycle. Skipping ahead is allowed,
/// staying put or moving backwards is not.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (NotReceived, ReceivedNotShipped)
            | (NotReceived, ReceivedShipping)
            | (NotReceived, Delivered)
            | (ReceivedNotShipped, ReceivedShipping)
            | (ReceivedNotShipped, Delivered)
            | (ReceivedShipping, Delivered)
    )
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub to: OrderStatus,
    /// Staff to attach when the order is picked up. Must already be resolved.
    pub staff_id: Option<Uuid>,
    pub note: Option<String>,
}

/// Moves `order` to `change.to` and stamps the timestamp of the state entered.
/// Timestamps of earlier states are left as they were.
pub fn apply_status_change(
    order: &mut DeliveryOrder,
    change: StatusChange,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !can_transition(order.status, change.to) {
        return Err(AppError::Validation(format!(
            "cannot move order {} from {} to {}",
            order.order_code,
            order.status.label(),
            change.to.label()
        )));
    }

    match change.to {
        OrderStatus::NotReceived => {}
        OrderStatus::ReceivedNotShipped => {
            order.received_at = Some(now);
            if let Some(staff_id) = change.staff_id {
                order.assigned_staff_id = Some(staff_id);
            }
        }
        OrderStatus::ReceivedShipping => order.delivery_started_at = Some(now),
        OrderStatus::Delivered => order.delivered_at = Some(now),
    }
    order.status = change.to;

    if let Some(note) = change.note {
        append_note(order, &note, now);
    }

    Ok(())
}

/// Adds a timestamped line to the order's notes. Blank notes are ignored.
pub fn append_note(order: &mut DeliveryOrder, text: &str, now: DateTime<Utc>) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    order.notes.push(NoteLine {
        at: now,
        text: text.to_string(),
    });
}

pub fn mark_paid(order: &mut DeliveryOrder, now: DateTime<Utc>) -> Result<(), AppError> {
    if order.is_paid {
        return Err(AppError::Conflict(format!(
            "order {} is already paid",
            order.order_code
        )));
    }

    order.is_paid = true;
    order.paid_amount = Some(order.shipping_fee);
    order.payment_time = Some(now);
    Ok(())
}

pub fn confirm_received(order: &mut DeliveryOrder, now: DateTime<Utc>) -> Result<(), AppError> {
    if order.status != OrderStatus::Delivered {
        return Err(AppError::Validation(format!(
            "order {} has not been delivered yet",
            order.order_code
        )));
    }
    if order.confirmed_received {
        return Err(AppError::Conflict(format!(
            "order {} was already confirmed",
            order.order_code
        )));
    }

    order.confirmed_received = true;
    order.confirmed_at = Some(now);
    Ok(())
}
