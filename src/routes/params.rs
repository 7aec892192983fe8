use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{PaymentStatus, Role};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkshopSortBy {
    CreatedAt,
    Title,
    Price,
    Rating,
}

// Query structs keep page/per_page inline: urlencoded extraction does not
// survive `#[serde(flatten)]` for non-string fields.

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WorkshopQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_series: Option<bool>,
    pub sort_by: Option<WorkshopSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CycleQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub workshop_id: Option<Uuid>,
    pub open_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PaymentQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub action: Option<String>,
}

macro_rules! paginated {
    ($($ty:ty),+) => {
        $(impl $ty {
            pub fn pagination(&self) -> Pagination {
                Pagination {
                    page: self.page,
                    per_page: self.per_page,
                }
            }
        })+
    };
}

paginated!(WorkshopQuery, CycleQuery, PaymentQuery, UserQuery, LogQuery);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));
        let p = Pagination {
            page: Some(-4),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.normalize(), (i64::MAX, 100, i64::MAX));
    }

    #[test]
    fn query_strings_deserialize_without_flatten() {
        let q: WorkshopQuery =
            serde_json::from_value(serde_json::json!({"page": 2, "is_series": true, "sort_by": "price"}))
                .unwrap();
        assert_eq!(q.pagination().normalize(), (2, 20, 20));
        assert_eq!(q.is_series, Some(true));
        assert!(matches!(q.sort_by, Some(WorkshopSortBy::Price)));
    }
}
