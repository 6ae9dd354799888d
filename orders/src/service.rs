use crate::{
    error::{OrderError, OrderResult},
    model::{
        Actor, ActorRole, Address, ModelId, NewAddress, NewOrder, Order, OrderItem, OrderStatus,
        PaymentInfo, PaymentMethod, PaymentStatus, ShippingInfo, StaffOrderUpdate, UserOrderUpdate,
    },
    notify::{notify_status_change, NotificationSender, StatusChangeNotice},
    payment::{PaymentProvider, Refund},
    repository::{AddressRepository, OrderRepository, ProductRepository, StockAdjustment},
    status::{can_transition, is_locked_for_customer, is_terminal},
};
use chrono::Utc;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Order/inventory workflow service. All collaborators are injected so the
/// storage and the external providers stay behind their seams.
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    addresses: Arc<dyn AddressRepository>,
    payments: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn NotificationSender>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        addresses: Arc<dyn AddressRepository>,
        payments: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        info!("Initializing OrderService");
        Self {
            orders,
            products,
            addresses,
            payments,
            notifier,
        }
    }

    pub async fn place_order(&self, actor: &Actor, req: NewOrder) -> OrderResult<Order> {
        if req.order_items.is_empty() {
            return Err(OrderError::validation(
                "Order must contain at least one item",
            ));
        }
        if req.prices.items_price < 0.0
            || req.prices.tax_price < 0.0
            || req.prices.shipping_price < 0.0
            || req.prices.discount_price < 0.0
        {
            return Err(OrderError::validation(
                "Price components must be non-negative",
            ));
        }

        let now = Utc::now();
        for item in &req.order_items {
            if item.quantity < 1 {
                return Err(OrderError::validation(format!(
                    "Quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            if item.pre_order {
                match item.available_on {
                    Some(date) if date > now => {}
                    _ => {
                        return Err(OrderError::validation(format!(
                            "Pre-order item for product {} must carry a future availability date",
                            item.product_id
                        )));
                    }
                }
            }
        }

        self.require_owned_address(actor, req.shipping_address_id)
            .await?;
        if let Some(billing_id) = req.billing_address_id {
            self.require_owned_address(actor, billing_id).await?;
        }

        let product_ids: Vec<ModelId> = req.order_items.iter().map(|i| i.product_id).collect();
        let products = self.products.get_products(&product_ids).await?;
        let by_id: HashMap<ModelId, _> = products.into_iter().map(|p| (p.id, p)).collect();

        let mut items = Vec::with_capacity(req.order_items.len());
        for item in &req.order_items {
            let product = by_id
                .get(&item.product_id)
                .ok_or_else(|| OrderError::not_found(format!("Product {} not found", item.product_id)))?;
            items.push(OrderItem {
                id: 0,
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.price,
                item_status: OrderStatus::Pending,
                pre_order: item.pre_order,
                available_on: item.available_on,
            });
        }

        // Charge the card before touching the database; provider failure
        // means no order exists at all.
        let payment = match (&req.payment_method, &req.card_source) {
            (PaymentMethod::Card, Some(source)) => {
                let charge = self.payments.create_charge(req.prices.total(), source).await?;
                debug!(charge_id = %charge.id, "Charge created for new order");
                PaymentInfo {
                    method: PaymentMethod::Card,
                    transaction_id: Some(charge.id),
                    status: PaymentStatus::Paid,
                    paid_at: Some(now),
                }
            }
            (method, _) => PaymentInfo::pending(*method),
        };

        let order = Order {
            id: 0,
            user_id: actor.user_id,
            shipping_address_id: req.shipping_address_id,
            billing_address_id: req.billing_address_id,
            items,
            payment,
            prices: req.prices,
            total_price: req.prices.total(),
            status: OrderStatus::Pending,
            shipping_info: ShippingInfo::default(),
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            order_notes: req.order_notes,
            updated_by: None,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let reservations = reserved_adjustments(&order);
        let saved = match self.orders.create_order(&order, &reservations).await {
            Ok(saved) => saved,
            Err(e) => {
                // The card was charged up front; give the money back before
                // surfacing the failure, or no order would ever exist for it.
                if order.payment.status == PaymentStatus::Paid {
                    if let Some(charge_id) = &order.payment.transaction_id {
                        match self
                            .payments
                            .refund(charge_id, order.total_price, "Order could not be created")
                            .await
                        {
                            Ok(refund) => warn!(
                                charge_id = %charge_id,
                                refund_id = %refund.id,
                                "Charge refunded after failed order creation"
                            ),
                            Err(refund_err) => error!(
                                charge_id = %charge_id,
                                error = %refund_err,
                                "Failed to refund charge after failed order creation"
                            ),
                        }
                    }
                }
                return Err(e);
            }
        };

        metrics::counter!("orders_placed_total").increment(1);
        info!(order_id = saved.id, user_id = actor.user_id, "Order placed");
        Ok(saved)
    }

    pub async fn get_order(&self, actor: &Actor, id: ModelId) -> OrderResult<Order> {
        let order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::not_found(format!("Order {} not found", id)))?;

        // An order that isn't yours reads as absent, not as forbidden.
        if !actor.is_staff() && (order.user_id != actor.user_id || order.deleted) {
            return Err(OrderError::not_found(format!("Order {} not found", id)));
        }
        Ok(order)
    }

    pub async fn list_orders(&self, actor: &Actor) -> OrderResult<Vec<Order>> {
        match actor.role {
            ActorRole::Staff => self.orders.list_orders(None, true).await,
            ActorRole::Customer => self.orders.list_orders(Some(actor.user_id), false).await,
        }
    }

    /// Self-service path: the owning user may edit notes or cancel, but only
    /// while the order is pre-shipment.
    pub async fn update_own_order(
        &self,
        actor: &Actor,
        id: ModelId,
        update: UserOrderUpdate,
    ) -> OrderResult<Order> {
        let mut order = self.get_order(actor, id).await?;
        if order.user_id != actor.user_id {
            return Err(OrderError::not_found(format!("Order {} not found", id)));
        }

        // Locked orders reject everything before any field is looked at.
        if is_locked_for_customer(order.status) {
            return Err(OrderError::InvalidTransition(format!(
                "Order in status {} can no longer be modified",
                order.status
            )));
        }

        let mut cancelled = false;
        if update.cancel_order {
            if !can_transition(order.status, OrderStatus::Cancelled, ActorRole::Customer) {
                return Err(OrderError::InvalidTransition(format!(
                    "Order in status {} cannot be cancelled",
                    order.status
                )));
            }
            order.status = OrderStatus::Cancelled;
            order.cancelled_at = Some(Utc::now());
            order.cancellation_reason = Some(
                update
                    .cancellation_reason
                    .unwrap_or_else(|| "Cancelled by user".to_string()),
            );
            cancelled = true;
        }

        if let Some(notes) = update.order_notes {
            order.order_notes = Some(notes);
        }

        order.updated_at = Utc::now();
        order.total_price = order.prices.total();

        let released = if cancelled {
            reserved_adjustments(&order)
        } else {
            Vec::new()
        };
        let saved = self.orders.save_order(&order, &released).await?;

        if cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
            self.dispatch_status_notice(&saved).await;
        }
        Ok(saved)
    }

    /// Staff path: advance the status and/or attach shipping info. One
    /// database transaction covers the order row and any stock release.
    pub async fn staff_update_order(
        &self,
        actor: &Actor,
        id: ModelId,
        update: StaffOrderUpdate,
    ) -> OrderResult<Order> {
        if !actor.is_staff() {
            return Err(OrderError::Authorization(
                "Staff role required to administer orders".to_string(),
            ));
        }
        if update.order_status.is_none() && update.shipping_info.is_none() {
            return Err(OrderError::validation(
                "Either orderStatus or shippingInfo must be provided",
            ));
        }

        let mut order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::not_found(format!("Order {} not found", id)))?;

        if is_terminal(order.status) {
            return Err(OrderError::InvalidTransition(format!(
                "Order in status {} cannot be updated further",
                order.status
            )));
        }

        let mut status_changed = false;
        let mut released = Vec::new();
        if let Some(word) = &update.order_status {
            let next = OrderStatus::from_str(word)
                .map_err(|_| OrderError::validation(format!("Unknown order status: {}", word)))?;

            if next != order.status {
                if !can_transition(order.status, next, ActorRole::Staff) {
                    return Err(OrderError::InvalidTransition(format!(
                        "Cannot move order from {} to {}",
                        order.status, next
                    )));
                }
                let now = Utc::now();
                order.status = next;
                status_changed = true;
                match next {
                    OrderStatus::Shipped => order.shipping_info.shipped_at = Some(now),
                    OrderStatus::Delivered => order.delivered_at = Some(now),
                    OrderStatus::Cancelled => {
                        order.cancelled_at = Some(now);
                        if order.cancellation_reason.is_none() {
                            order.cancellation_reason = Some("Cancelled by staff".to_string());
                        }
                        released = reserved_adjustments(&order);
                    }
                    _ => {}
                }
            }
        }

        if let Some(patch) = &update.shipping_info {
            order.shipping_info.merge(patch);
        }

        order.updated_by = Some(actor.user_id);
        order.updated_at = Utc::now();
        order.total_price = order.prices.total();

        let saved = self.orders.save_order(&order, &released).await?;

        if status_changed {
            if saved.status == OrderStatus::Cancelled {
                metrics::counter!("orders_cancelled_total").increment(1);
            }
            self.dispatch_status_notice(&saved).await;
        }
        Ok(saved)
    }

    /// Refund through the payment provider, mirroring cancellation. No order
    /// mutation happens before the provider call succeeds; the transition
    /// table rejects a second refund (Cancelled allows nothing), so stock is
    /// never double-restored.
    pub async fn refund_order(
        &self,
        actor: &Actor,
        id: ModelId,
        reason: Option<String>,
    ) -> OrderResult<(Order, Refund)> {
        if !actor.is_staff() {
            return Err(OrderError::Authorization(
                "Staff role required to refund orders".to_string(),
            ));
        }

        let mut order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::not_found(format!("Order {} not found", id)))?;

        // A refund ends in Cancelled, so it obeys the same transition table
        // as every other status change.
        if !can_transition(order.status, OrderStatus::Cancelled, ActorRole::Staff) {
            return Err(OrderError::InvalidTransition(format!(
                "Order in status {} cannot be refunded",
                order.status
            )));
        }
        if order.payment.method != PaymentMethod::Card {
            return Err(OrderError::UnsupportedOperation(format!(
                "Payment method {} does not support refunds",
                order.payment.method
            )));
        }
        let charge_id = order
            .payment
            .transaction_id
            .clone()
            .ok_or_else(|| OrderError::validation("Order has no payment transaction to refund"))?;

        let reason = reason.unwrap_or_else(|| "Refunded by staff".to_string());
        let refund = self
            .payments
            .refund(&charge_id, order.total_price, &reason)
            .await?;
        debug!(order_id = order.id, refund_id = %refund.id, "Provider refund succeeded");

        let now = Utc::now();
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(now);
        order.cancellation_reason = Some(reason);
        order.payment.status = PaymentStatus::Refunded;
        order.updated_by = Some(actor.user_id);
        order.updated_at = now;
        order.total_price = order.prices.total();

        let released = reserved_adjustments(&order);
        let saved = self.orders.save_order(&order, &released).await?;

        metrics::counter!("orders_refunded_total").increment(1);
        self.dispatch_status_notice(&saved).await;
        info!(order_id = saved.id, "Order refunded and cancelled");
        Ok((saved, refund))
    }

    /// Historical orders are soft-deleted, never removed.
    pub async fn delete_order(&self, actor: &Actor, id: ModelId) -> OrderResult<()> {
        if !actor.is_staff() {
            return Err(OrderError::Authorization(
                "Staff role required to delete orders".to_string(),
            ));
        }
        let mut order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::not_found(format!("Order {} not found", id)))?;

        if !order.deleted {
            order.deleted = true;
            order.deleted_at = Some(Utc::now());
            order.updated_by = Some(actor.user_id);
            order.updated_at = Utc::now();
            self.orders.save_order(&order, &[]).await?;
        }
        Ok(())
    }

    pub async fn create_address(&self, actor: &Actor, address: NewAddress) -> OrderResult<Address> {
        if address.line1.trim().is_empty()
            || address.city.trim().is_empty()
            || address.country.trim().is_empty()
        {
            return Err(OrderError::validation(
                "Address line, city and country are required",
            ));
        }
        self.addresses.create_address(actor.user_id, &address).await
    }

    pub async fn list_addresses(&self, actor: &Actor) -> OrderResult<Vec<Address>> {
        self.addresses.list_addresses(actor.user_id).await
    }

    async fn require_owned_address(&self, actor: &Actor, id: ModelId) -> OrderResult<()> {
        match self.addresses.get_address(id).await? {
            Some(address) if address.user_id == actor.user_id => Ok(()),
            _ => Err(OrderError::not_found(format!("Address {} not found", id))),
        }
    }

    async fn dispatch_status_notice(&self, order: &Order) {
        notify_status_change(
            self.notifier.as_ref(),
            StatusChangeNotice {
                order_id: order.id,
                user_id: order.user_id,
                new_status: order.status,
            },
        )
        .await;
    }
}

/// Stock reserved by an order: one adjustment per product over the
/// non-pre-order line items. Pre-order items never touch stock.
pub fn reserved_adjustments(order: &Order) -> Vec<StockAdjustment> {
    let mut by_product: HashMap<ModelId, i32> = HashMap::new();
    for item in order.items.iter().filter(|i| !i.pre_order) {
        *by_product.entry(item.product_id).or_insert(0) += item.quantity;
    }
    let mut adjustments: Vec<StockAdjustment> = by_product
        .into_iter()
        .map(|(product_id, quantity)| StockAdjustment {
            product_id,
            quantity,
        })
        .collect();
    adjustments.sort_by_key(|a| a.product_id);
    adjustments
}
