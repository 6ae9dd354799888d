use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub type ModelId = i64;

/// Order lifecycle states. String forms match the wire words used by the
/// storefront API ("On Hold" included).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(rename = "On Hold")]
    #[strum(to_string = "On Hold")]
    OnHold,
    Returned,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum PaymentMethod {
    Card,
    #[serde(rename = "Cash on Delivery")]
    #[strum(to_string = "Cash on Delivery")]
    CashOnDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Customer,
    Staff,
}

/// Identity carried in from the upstream auth layer. The domain only cares
/// about who is acting and with which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ModelId,
    pub role: ActorRole,
}

impl Actor {
    pub fn customer(user_id: ModelId) -> Self {
        Self {
            user_id,
            role: ActorRole::Customer,
        }
    }

    pub fn staff(user_id: ModelId) -> Self {
        Self {
            user_id,
            role: ActorRole::Staff,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == ActorRole::Staff
    }
}

/// Price components of an order. The total is always derived from these,
/// never stored independently of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    #[serde(default)]
    pub discount_price: f64,
}

impl PriceBreakdown {
    pub fn total(&self) -> f64 {
        self.items_price + self.tax_price + self.shipping_price - self.discount_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentInfo {
    pub fn pending(method: PaymentMethod) -> Self {
        Self {
            method,
            transaction_id: None,
            status: PaymentStatus::Pending,
            paid_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
}

/// Partial shipping info as sent by staff; merged field by field into the
/// stored shipping info, never replacing it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfoPatch {
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
}

impl ShippingInfo {
    pub fn merge(&mut self, patch: &ShippingInfoPatch) {
        if let Some(courier) = &patch.courier {
            self.courier = Some(courier.clone());
        }
        if let Some(tracking) = &patch.tracking_number {
            self.tracking_number = Some(tracking.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: ModelId,
    pub product_id: ModelId,
    pub quantity: i32,
    /// Unit price snapshot taken from the product at order creation.
    pub unit_price: f64,
    pub item_status: OrderStatus,
    pub pre_order: bool,
    pub available_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: ModelId,
    pub user_id: ModelId,
    pub shipping_address_id: ModelId,
    pub billing_address_id: Option<ModelId>,
    pub items: Vec<OrderItem>,
    pub payment: PaymentInfo,
    pub prices: PriceBreakdown,
    /// Derived from `prices`; recomputed on every write, never set by callers.
    pub total_price: f64,
    pub status: OrderStatus,
    pub shipping_info: ShippingInfo,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub order_notes: Option<String>,
    pub updated_by: Option<ModelId>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ModelId,
    pub name: String,
    pub price: f64,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: ModelId,
    pub user_id: ModelId,
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    #[serde(rename = "product")]
    pub product_id: ModelId,
    pub quantity: i32,
    #[serde(default)]
    pub pre_order: bool,
    pub available_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(rename = "shippingAddress")]
    pub shipping_address_id: ModelId,
    #[serde(rename = "billingAddress")]
    pub billing_address_id: Option<ModelId>,
    pub order_items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    /// Opaque card token from the payment widget; when present a charge is
    /// created up front and the order starts out Paid.
    pub card_source: Option<String>,
    #[serde(flatten)]
    pub prices: PriceBreakdown,
    pub order_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserOrderUpdate {
    pub order_notes: Option<String>,
    #[serde(default)]
    pub cancel_order: bool,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StaffOrderUpdate {
    /// Raw status word; parsed by the service so an unknown value surfaces
    /// as a 400 instead of a deserialization failure.
    pub order_status: Option<String>,
    pub shipping_info: Option<ShippingInfoPatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}
