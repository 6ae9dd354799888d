use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM Product Entity
pub mod product {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "products")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub price: f64,
        pub stock: i32,
        pub created_at: NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::order_item::Entity")]
        OrderItems,
    }

    impl Related<super::order_item::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::OrderItems.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// SeaORM Order Entity
pub mod order {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "orders")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub shipping_address_id: i64,
        pub billing_address_id: Option<i64>,
        pub payment_method: String,
        pub payment_transaction_id: Option<String>,
        pub payment_status: String,
        pub paid_at: Option<NaiveDateTime>,
        pub items_price: f64,
        pub tax_price: f64,
        pub shipping_price: f64,
        pub discount_price: f64,
        pub total_price: f64,
        pub status: String,
        pub courier: Option<String>,
        pub tracking_number: Option<String>,
        pub shipped_at: Option<NaiveDateTime>,
        pub delivered_at: Option<NaiveDateTime>,
        pub cancelled_at: Option<NaiveDateTime>,
        pub cancellation_reason: Option<String>,
        pub order_notes: Option<String>,
        pub updated_by: Option<i64>,
        pub deleted: bool,
        pub deleted_at: Option<NaiveDateTime>,
        pub created_at: NaiveDateTime,
        pub updated_at: NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::order_item::Entity")]
        OrderItems,
        #[sea_orm(
            belongs_to = "super::address::Entity",
            from = "Column::ShippingAddressId",
            to = "super::address::Column::Id"
        )]
        ShippingAddress,
    }

    impl Related<super::order_item::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::OrderItems.def()
        }
    }

    impl Related<super::address::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::ShippingAddress.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// SeaORM Order Item Entity
pub mod order_item {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "order_items")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub order_id: i64,
        pub product_id: i64,
        pub quantity: i32,
        pub unit_price: f64,
        pub item_status: String,
        pub pre_order: bool,
        pub available_on: Option<NaiveDateTime>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::order::Entity",
            from = "Column::OrderId",
            to = "super::order::Column::Id"
        )]
        Order,
        #[sea_orm(
            belongs_to = "super::product::Entity",
            from = "Column::ProductId",
            to = "super::product::Column::Id"
        )]
        Product,
    }

    impl Related<super::order::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Order.def()
        }
    }

    impl Related<super::product::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Product.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// SeaORM Address Entity
pub mod address {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "addresses")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub line1: String,
        pub city: String,
        pub postal_code: String,
        pub country: String,
        pub is_default: bool,
        pub created_at: NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::order::Entity")]
        Orders,
    }

    impl Related<super::order::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Orders.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
