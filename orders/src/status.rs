use crate::model::{ActorRole, OrderStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use ActorRole::*;
use OrderStatus::*;

/// Single transition authority for both the self-service and the staff code
/// paths, keyed by (current status, actor role).
static TRANSITIONS: Lazy<HashMap<(OrderStatus, ActorRole), Vec<OrderStatus>>> = Lazy::new(|| {
    let mut table = HashMap::new();

    // Staff drive the fulfilment cycle.
    table.insert((Pending, Staff), vec![Processing, OnHold, Shipped, Cancelled]);
    table.insert((Processing, Staff), vec![Shipped, OnHold, Cancelled]);
    table.insert((OnHold, Staff), vec![Pending, Processing, Cancelled]);
    table.insert((Shipped, Staff), vec![Delivered, Returned]);
    table.insert((Returned, Staff), vec![Cancelled]);

    // Customers may only back out before shipment.
    table.insert((Pending, Customer), vec![Cancelled]);
    table.insert((Processing, Customer), vec![Cancelled]);
    table.insert((OnHold, Customer), vec![Cancelled]);

    // Delivered and Cancelled are terminal for everyone; absent keys mean
    // no transitions.
    table
});

pub fn allowed_transitions(current: OrderStatus, role: ActorRole) -> &'static [OrderStatus] {
    TRANSITIONS
        .get(&(current, role))
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

pub fn can_transition(current: OrderStatus, next: OrderStatus, role: ActorRole) -> bool {
    allowed_transitions(current, role).contains(&next)
}

/// Orders in a terminal state never change status again, for any actor.
pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, Delivered | Cancelled)
}

/// Once an order has shipped the owning customer can no longer touch it,
/// not even the notes.
pub fn is_locked_for_customer(status: OrderStatus) -> bool {
    matches!(status, Shipped | Delivered | Cancelled)
}
