use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    availability::{Availability, Countdown, DateRange, TimeState},
    dto::double_option,
    models::{WorkshopCycle, WorkshopSession},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCycleRequest {
    pub workshop_id: Uuid,
    pub display_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_open_for_enrollment: Option<bool>,
    pub max_participants_override: Option<i32>,
    pub address_id: Option<Uuid>,
    pub instructor_override_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCycleRequest {
    pub display_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    /// `null` falls back to the workshop capacity.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_participants_override: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub address_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub instructor_override_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetEnrollmentOpenRequest {
    pub open: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionRequest {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub address_id: Option<Uuid>,
}

/// A cycle with its derived range, time state and seat availability.
#[derive(Debug, Serialize, ToSchema)]
pub struct CycleSummary {
    pub cycle: WorkshopCycle,
    pub range: DateRange,
    pub range_label: String,
    pub time_state: TimeState,
    pub countdown: Option<Countdown>,
    pub availability: Availability,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub session: WorkshopSession,
    pub time_state: TimeState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CycleDetails {
    pub workshop_title: String,
    pub summary: CycleSummary,
    pub sessions: Vec<SessionView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CycleList {
    #[schema(value_type = Vec<CycleSummary>)]
    pub items: Vec<CycleSummary>,
}
