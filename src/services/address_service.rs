use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::{AddressList, AddressRequest},
    entity::{
        addresses::{ActiveModel, Column, Entity as Addresses, Model as AddressModel},
        workshop_cycles::{Column as CycleCol, Entity as WorkshopCycles},
        workshop_sessions::{Column as SessionCol, Entity as WorkshopSessions},
        workshops::{Column as WorkshopCol, Entity as Workshops},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_addresses(state: &AppState) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<Address> = Addresses::find()
        .order_by_asc(Column::City)
        .order_by_asc(Column::Street)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_address(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Address>> {
    let address = Addresses::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Address", address_from_entity(address), None))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    ensure_admin(user)?;
    let payload = validate(payload)?;
    let address = ActiveModel {
        id: Set(Uuid::new_v4()),
        street: Set(payload.street),
        building_number: Set(payload.building_number),
        apartment_number: Set(payload.apartment_number),
        city: Set(payload.city),
        postal_code: Set(payload.postal_code),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "address_create",
        "addresses",
        serde_json::json!({ "address_id": address.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address created",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    ensure_admin(user)?;
    let existing = Addresses::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let payload = validate(payload)?;

    let mut active: ActiveModel = existing.into();
    active.street = Set(payload.street);
    active.building_number = Set(payload.building_number);
    active.apartment_number = Set(payload.apartment_number);
    active.city = Set(payload.city);
    active.postal_code = Set(payload.postal_code);
    let address = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "address_update",
        "addresses",
        serde_json::json!({ "address_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let workshops = Workshops::find()
        .filter(WorkshopCol::AddressId.eq(id))
        .count(&state.orm)
        .await?;
    let cycles = WorkshopCycles::find()
        .filter(Condition::all().add(CycleCol::AddressId.eq(id)))
        .count(&state.orm)
        .await?;
    let sessions = WorkshopSessions::find()
        .filter(SessionCol::AddressId.eq(id))
        .count(&state.orm)
        .await?;
    if workshops + cycles + sessions > 0 {
        return Err(AppError::BadRequest("Address is still in use".into()));
    }

    let result = Addresses::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "address_delete",
        "addresses",
        serde_json::json!({ "address_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate(payload: AddressRequest) -> AppResult<AddressRequest> {
    let trimmed = AddressRequest {
        street: payload.street.trim().to_string(),
        building_number: payload.building_number.trim().to_string(),
        apartment_number: payload
            .apartment_number
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        city: payload.city.trim().to_string(),
        postal_code: payload.postal_code.trim().to_string(),
    };
    if trimmed.street.is_empty()
        || trimmed.building_number.is_empty()
        || trimmed.city.is_empty()
        || trimmed.postal_code.is_empty()
    {
        return Err(AppError::BadRequest(
            "street, building_number, city and postal_code are required".into(),
        ));
    }
    Ok(trimmed)
}

/// "Main St 5/2, 00-001 Warsaw"
pub fn address_label(
    street: &str,
    building_number: &str,
    apartment_number: Option<&str>,
    postal_code: &str,
    city: &str,
) -> String {
    let number = match apartment_number {
        Some(apt) => format!("{building_number}/{apt}"),
        None => building_number.to_string(),
    };
    format!("{street} {number}, {postal_code} {city}")
}

pub(crate) fn address_from_entity(model: AddressModel) -> Address {
    let label = address_label(
        &model.street,
        &model.building_number,
        model.apartment_number.as_deref(),
        &model.postal_code,
        &model.city,
    );
    Address {
        id: model.id,
        street: model.street,
        building_number: model.building_number,
        apartment_number: model.apartment_number,
        city: model.city,
        postal_code: model.postal_code,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_apartment_when_present() {
        assert_eq!(
            address_label("Main St", "5", Some("2"), "00-001", "Warsaw"),
            "Main St 5/2, 00-001 Warsaw"
        );
        assert_eq!(
            address_label("Main St", "5", None, "00-001", "Warsaw"),
            "Main St 5, 00-001 Warsaw"
        );
    }

    #[test]
    fn blank_fields_are_rejected() {
        let err = validate(AddressRequest {
            street: "  ".into(),
            building_number: "1".into(),
            apartment_number: Some(" ".into()),
            city: "Krakow".into(),
            postal_code: "30-001".into(),
        });
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }
}
