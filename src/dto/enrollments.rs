use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    availability::{Availability, PaymentState, TimeState},
    models::{Enrollment, Payment},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollRequest {
    pub cycle_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollResponse {
    pub enrollment: Enrollment,
    pub payment: Option<Payment>,
    pub availability: Availability,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentView {
    pub enrollment: Enrollment,
    pub workshop_id: Uuid,
    pub workshop_title: String,
    pub cycle_name: String,
    pub range_label: String,
    pub time_state: TimeState,
    pub payment_state: PaymentState,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EnrollmentList {
    #[schema(value_type = Vec<EnrollmentView>)]
    pub items: Vec<EnrollmentView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Participant {
    pub enrollment: Enrollment,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub payment_state: PaymentState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantList {
    pub availability: Availability,
    pub items: Vec<Participant>,
}
