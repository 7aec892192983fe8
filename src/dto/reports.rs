use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::availability::Availability;

#[derive(Debug, Serialize, ToSchema)]
pub struct OccupancyRow {
    pub cycle_id: Uuid,
    pub cycle_name: String,
    pub workshop_id: Uuid,
    pub workshop_title: String,
    pub availability: Availability,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueRow {
    pub workshop_id: Uuid,
    pub workshop_title: String,
    pub paid_total: i64,
    pub pending_total: i64,
    pub paid_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorRow {
    pub instructor_id: Uuid,
    pub email: String,
    pub cycle_count: i64,
    pub active_participants: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OccupancyReport {
    #[schema(value_type = Vec<OccupancyRow>)]
    pub items: Vec<OccupancyRow>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RevenueReport {
    #[schema(value_type = Vec<RevenueRow>)]
    pub items: Vec<RevenueRow>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct InstructorReport {
    #[schema(value_type = Vec<InstructorRow>)]
    pub items: Vec<InstructorRow>,
}
