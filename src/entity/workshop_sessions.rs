use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workshop_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub topic: String,
    pub start_time: DateTimeWithTimeZone,
    pub end_time: DateTimeWithTimeZone,
    pub address_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workshop_cycles::Entity",
        from = "Column::CycleId",
        to = "super::workshop_cycles::Column::Id"
    )]
    WorkshopCycles,
}

impl Related<super::workshop_cycles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkshopCycles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
