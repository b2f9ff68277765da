use sea_orm::entity::prelude::*;

use crate::status::OrderStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub address: Option<String>,
    pub products_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub status: OrderStatus,
    pub post_office: Option<String>,
    pub post_office_city: Option<String>,
    pub tracking_number: Option<String>,
    pub commission_settled: bool,
    pub created_date: DateTimeWithTimeZone,
    pub updated_date: DateTimeWithTimeZone,
    pub deleted_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
