use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{cycles::CycleSummary, double_option},
    models::{Address, Category, Workshop},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkshopRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_series: bool,
    pub price: i64,
    pub max_participants: Option<i32>,
    pub category_id: Uuid,
    pub address_id: Uuid,
    pub default_instructor_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateWorkshopRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_series: Option<bool>,
    pub price: Option<i64>,
    /// `null` makes the workshop unlimited.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_participants: Option<Option<i32>>,
    pub category_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub default_instructor_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WorkshopList {
    #[schema(value_type = Vec<Workshop>)]
    pub items: Vec<Workshop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkshopDetails {
    pub workshop: Workshop,
    pub category: Category,
    pub address: Address,
    pub cycles: Vec<CycleSummary>,
}
