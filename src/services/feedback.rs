use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, authorize_owner, Operation};
use crate::error::AppError;
use crate::models::feedback::Feedback;
use crate::services::orders::find_order;
use crate::state::AppState;

const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub order_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Records a rating from the customer who created the order.
pub fn post_feedback(
    state: &AppState,
    identity: &Identity,
    request: NewFeedback,
) -> Result<Feedback, AppError> {
    authorize(identity, Operation::PostFeedback)?;
    if !RATING_RANGE.contains(&request.rating) {
        return Err(AppError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            request.rating
        )));
    }

    let order = find_order(state, request.order_id)?;
    authorize_owner(identity, Operation::PostFeedback, order.created_by)?;

    let feedback = Feedback {
        id: Uuid::new_v4(),
        order_id: order.id,
        user_id: identity.user_id,
        rating: request.rating,
        comment: request.comment.trim().to_string(),
        created_at: Utc::now(),
    };
    state.feedback.insert(feedback.id, feedback.clone());

    info!(order_id = %order.id, rating = feedback.rating, "feedback received");
    Ok(feedback)
}

fn newest_first(mut feedback: Vec<Feedback>) -> Vec<Feedback> {
    feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feedback
}

pub fn feedback_for_order(
    state: &AppState,
    identity: &Identity,
    order_id: Uuid,
) -> Result<Vec<Feedback>, AppError> {
    authorize(identity, Operation::ReadFeedback)?;
    find_order(state, order_id)?;

    Ok(newest_first(
        state
            .feedback
            .iter()
            .filter(|e| e.value().order_id == order_id)
            .map(|e| e.value().clone())
            .collect(),
    ))
}

pub fn my_feedback(state: &AppState, identity: &Identity) -> Result<Vec<Feedback>, AppError> {
    authorize(identity, Operation::ListMyFeedback)?;

    Ok(newest_first(
        state
            .feedback
            .iter()
            .filter(|e| e.value().user_id == identity.user_id)
            .map(|e| e.value().clone())
            .collect(),
    ))
}
