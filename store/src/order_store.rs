use crate::entities::{address, order, order_item, product};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use orders::{
    error::{OrderError, OrderResult},
    model::{
        Address, ModelId, NewAddress, Order, OrderItem, OrderStatus, PaymentInfo, PaymentMethod,
        PaymentStatus, Product, ShippingInfo,
    },
    repository::{AddressRepository, OrderRepository, ProductRepository, StockAdjustment},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, NotSet, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::str::FromStr;
use tracing::{debug, info};

/// SeaORM-backed storage for the order/inventory workflow. One instance
/// serves all three repository traits so the service wires against a single
/// connection pool.
pub struct SeaOrmStore {
    pub db: DatabaseConnection,
}

impl SeaOrmStore {
    pub async fn new(database_url: &str) -> Result<Self, DbErr> {
        let db = Database::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn with_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Conditional reservation: the decrement itself is the authority. Zero
    /// rows affected means the stock would go negative, which aborts the
    /// surrounding transaction.
    async fn reserve_stock(
        txn: &DatabaseTransaction,
        adj: &StockAdjustment,
    ) -> OrderResult<()> {
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).sub(adj.quantity),
            )
            .filter(product::Column::Id.eq(adj.product_id))
            .filter(product::Column::Stock.gte(adj.quantity))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(OrderError::InsufficientStock {
                product_id: adj.product_id,
                requested: adj.quantity,
            });
        }
        Ok(())
    }

    async fn release_stock(
        txn: &DatabaseTransaction,
        adjustments: &[StockAdjustment],
    ) -> OrderResult<()> {
        for adj in adjustments {
            product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).add(adj.quantity),
                )
                .filter(product::Column::Id.eq(adj.product_id))
                .exec(txn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn load_items(&self, order_id: ModelId) -> OrderResult<Vec<order_item::Model>> {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl ProductRepository for SeaOrmStore {
    async fn get_products(&self, ids: &[ModelId]) -> OrderResult<Vec<Product>> {
        let models = product::Entity::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models
            .into_iter()
            .map(|m| Product {
                id: m.id,
                name: m.name,
                price: m.price,
                stock: m.stock,
            })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for SeaOrmStore {
    async fn create_order(
        &self,
        new_order: &Order,
        reservations: &[StockAdjustment],
    ) -> OrderResult<Order> {
        debug!(user_id = new_order.user_id, "Creating order");
        let txn = self.db.begin().await.map_err(db_err)?;

        // Reservations first: a failed decrement aborts before any order
        // row exists.
        for adj in reservations {
            Self::reserve_stock(&txn, adj).await?;
        }

        let active = order_to_active(new_order);
        let saved = active.insert(&txn).await.map_err(db_err)?;

        let mut item_models = Vec::with_capacity(new_order.items.len());
        for item in &new_order.items {
            let item_active = order_item::ActiveModel {
                id: NotSet,
                order_id: Set(saved.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                item_status: Set(item.item_status.to_string()),
                pre_order: Set(item.pre_order),
                available_on: Set(item.available_on.map(|d| d.naive_utc())),
            };
            item_models.push(item_active.insert(&txn).await.map_err(db_err)?);
        }

        txn.commit().await.map_err(db_err)?;
        info!(order_id = saved.id, "Order persisted");

        hydrate_order(saved, item_models)
    }

    async fn get_order(&self, id: ModelId) -> OrderResult<Option<Order>> {
        let Some(model) = order::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let items = self.load_items(model.id).await?;
        hydrate_order(model, items).map(Some)
    }

    async fn list_orders(
        &self,
        user: Option<ModelId>,
        include_deleted: bool,
    ) -> OrderResult<Vec<Order>> {
        let mut query = order::Entity::find().order_by_asc(order::Column::Id);
        if let Some(user_id) = user {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        if !include_deleted {
            query = query.filter(order::Column::Deleted.eq(false));
        }
        let models = query.all(&self.db).await.map_err(db_err)?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let items = self.load_items(model.id).await?;
            result.push(hydrate_order(model, items)?);
        }
        Ok(result)
    }

    async fn save_order(&self, updated: &Order, released: &[StockAdjustment]) -> OrderResult<Order> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut active = order_to_active(updated);
        active.id = Set(updated.id);
        let saved = active.update(&txn).await.map_err(db_err)?;

        Self::release_stock(&txn, released).await?;

        txn.commit().await.map_err(db_err)?;
        debug!(order_id = saved.id, status = %saved.status, "Order saved");

        let items = self.load_items(saved.id).await?;
        hydrate_order(saved, items)
    }
}

#[async_trait]
impl AddressRepository for SeaOrmStore {
    async fn create_address(
        &self,
        user_id: ModelId,
        new_address: &NewAddress,
    ) -> OrderResult<Address> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // At most one default per user: unset the others in the same
        // transaction as the insert.
        if new_address.is_default {
            address::Entity::update_many()
                .col_expr(address::Column::IsDefault, Expr::value(false))
                .filter(address::Column::UserId.eq(user_id))
                .filter(address::Column::IsDefault.eq(true))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        let active = address::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            line1: Set(new_address.line1.clone()),
            city: Set(new_address.city.clone()),
            postal_code: Set(new_address.postal_code.clone()),
            country: Set(new_address.country.clone()),
            is_default: Set(new_address.is_default),
            created_at: Set(Utc::now().naive_utc()),
        };
        let saved = active.insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(address_from_model(saved))
    }

    async fn get_address(&self, id: ModelId) -> OrderResult<Option<Address>> {
        let model = address::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(address_from_model))
    }

    async fn list_addresses(&self, user_id: ModelId) -> OrderResult<Vec<Address>> {
        let models = address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_asc(address::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(address_from_model).collect())
    }
}

fn db_err(e: DbErr) -> OrderError {
    OrderError::Storage(e.to_string())
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

fn address_from_model(model: address::Model) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        line1: model.line1,
        city: model.city,
        postal_code: model.postal_code,
        country: model.country,
        is_default: model.is_default,
    }
}

/// Map a domain order onto its row. The caller decides whether the id is
/// NotSet (insert) or Set (update); items are written separately.
fn order_to_active(order: &Order) -> order::ActiveModel {
    order::ActiveModel {
        id: NotSet,
        user_id: Set(order.user_id),
        shipping_address_id: Set(order.shipping_address_id),
        billing_address_id: Set(order.billing_address_id),
        payment_method: Set(order.payment.method.to_string()),
        payment_transaction_id: Set(order.payment.transaction_id.clone()),
        payment_status: Set(order.payment.status.to_string()),
        paid_at: Set(order.payment.paid_at.map(|d| d.naive_utc())),
        items_price: Set(order.prices.items_price),
        tax_price: Set(order.prices.tax_price),
        shipping_price: Set(order.prices.shipping_price),
        discount_price: Set(order.prices.discount_price),
        total_price: Set(order.prices.total()),
        status: Set(order.status.to_string()),
        courier: Set(order.shipping_info.courier.clone()),
        tracking_number: Set(order.shipping_info.tracking_number.clone()),
        shipped_at: Set(order.shipping_info.shipped_at.map(|d| d.naive_utc())),
        delivered_at: Set(order.delivered_at.map(|d| d.naive_utc())),
        cancelled_at: Set(order.cancelled_at.map(|d| d.naive_utc())),
        cancellation_reason: Set(order.cancellation_reason.clone()),
        order_notes: Set(order.order_notes.clone()),
        updated_by: Set(order.updated_by),
        deleted: Set(order.deleted),
        deleted_at: Set(order.deleted_at.map(|d| d.naive_utc())),
        created_at: Set(order.created_at.naive_utc()),
        updated_at: Set(order.updated_at.naive_utc()),
    }
}

fn hydrate_order(model: order::Model, items: Vec<order_item::Model>) -> OrderResult<Order> {
    let status = OrderStatus::from_str(&model.status)
        .map_err(|_| OrderError::Storage(format!("Unknown order status in row: {}", model.status)))?;
    let payment_status = PaymentStatus::from_str(&model.payment_status).map_err(|_| {
        OrderError::Storage(format!(
            "Unknown payment status in row: {}",
            model.payment_status
        ))
    })?;
    let payment_method = PaymentMethod::from_str(&model.payment_method).map_err(|_| {
        OrderError::Storage(format!(
            "Unknown payment method in row: {}",
            model.payment_method
        ))
    })?;

    let mut order_items = Vec::with_capacity(items.len());
    for item in items {
        let item_status = OrderStatus::from_str(&item.item_status).map_err(|_| {
            OrderError::Storage(format!("Unknown item status in row: {}", item.item_status))
        })?;
        order_items.push(OrderItem {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            item_status,
            pre_order: item.pre_order,
            available_on: item.available_on.map(utc),
        });
    }

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        shipping_address_id: model.shipping_address_id,
        billing_address_id: model.billing_address_id,
        items: order_items,
        payment: PaymentInfo {
            method: payment_method,
            transaction_id: model.payment_transaction_id,
            status: payment_status,
            paid_at: model.paid_at.map(utc),
        },
        prices: orders::model::PriceBreakdown {
            items_price: model.items_price,
            tax_price: model.tax_price,
            shipping_price: model.shipping_price,
            discount_price: model.discount_price,
        },
        total_price: model.total_price,
        status,
        shipping_info: ShippingInfo {
            courier: model.courier,
            tracking_number: model.tracking_number,
            shipped_at: model.shipped_at.map(utc),
        },
        delivered_at: model.delivered_at.map(utc),
        cancelled_at: model.cancelled_at.map(utc),
        cancellation_reason: model.cancellation_reason,
        order_notes: model.order_notes,
        updated_by: model.updated_by,
        deleted: model.deleted,
        deleted_at: model.deleted_at.map(utc),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}
