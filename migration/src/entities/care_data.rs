use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "care_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub camper_id: i32,
    pub insulin_type: Option<String>,
    pub delivery_method: Option<String>,
    pub target_bg_low: Option<i32>,
    pub target_bg_high: Option<i32>,
    pub carb_ratio: Option<f64>,
    pub correction_factor: Option<f64>,
    pub long_acting_units: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub allergies: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub medications: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
