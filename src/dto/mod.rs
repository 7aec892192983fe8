use serde::{Deserialize, Deserializer};

pub mod addresses;
pub mod auth;
pub mod categories;
pub mod cycles;
pub mod enrollments;
pub mod logs;
pub mod payments;
pub mod reports;
pub mod reviews;
pub mod users;
pub mod workshops;

/// PATCH semantics for nullable columns.
///
/// * field absent  => `None`          (keep)
/// * field `null`  => `Some(None)`    (clear)
/// * field value   => `Some(Some(v))` (set)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::cycles::UpdateCycleRequest;

    #[test]
    fn null_clears_and_absent_keeps() {
        let req: UpdateCycleRequest =
            serde_json::from_str(r#"{"max_participants_override": null}"#).unwrap();
        assert_eq!(req.max_participants_override, Some(None));
        assert_eq!(req.instructor_override_id, None);

        let req: UpdateCycleRequest =
            serde_json::from_str(r#"{"max_participants_override": 7}"#).unwrap();
        assert_eq!(req.max_participants_override, Some(Some(7)));
    }
}
