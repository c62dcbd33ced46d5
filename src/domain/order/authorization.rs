//! Role and ownership checks for every order operation.
//!
//! Permissions are a table of `(role, capability) -> grant`; call sites ask
//! for a capability and never compare roles themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::errors::OrderError;
use super::filter::OrderFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// Authenticated caller of an order operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self { user_id, role: Role::User }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Admin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewOrder,
    CancelOrder,
    AdvanceStatus,
    ListAllOrders,
    ViewReports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    Any,
    OwnOnly,
    Denied,
}

fn grant(role: Role, capability: Capability) -> Grant {
    match (role, capability) {
        (Role::Admin, _) => Grant::Any,
        (Role::User, Capability::ViewOrder | Capability::CancelOrder) => Grant::OwnOnly,
        (Role::User, _) => Grant::Denied,
    }
}

/// Check `capability` for `actor` on a resource owned by `owner`
/// (`None` when the capability is not tied to one order).
pub fn authorize(actor: &Actor, capability: Capability, owner: Option<Uuid>) -> Result<(), OrderError> {
    match grant(actor.role, capability) {
        Grant::Any => Ok(()),
        Grant::OwnOnly if owner == Some(actor.user_id) => Ok(()),
        Grant::OwnOnly => Err(OrderError::Forbidden(format!(
            "user {} may only {:?} their own orders",
            actor.user_id, capability
        ))),
        Grant::Denied => Err(OrderError::Forbidden(format!(
            "role {:?} lacks {:?}",
            actor.role, capability
        ))),
    }
}

pub fn ensure_can_view(actor: &Actor, order: &Order) -> Result<(), OrderError> {
    authorize(actor, Capability::ViewOrder, Some(order.user_id()))
}

pub fn ensure_can_cancel(actor: &Actor, order: &Order) -> Result<(), OrderError> {
    authorize(actor, Capability::CancelOrder, Some(order.user_id()))
}

pub fn ensure_can_advance(actor: &Actor) -> Result<(), OrderError> {
    authorize(actor, Capability::AdvanceStatus, None)
}

pub fn ensure_can_view_reports(actor: &Actor) -> Result<(), OrderError> {
    authorize(actor, Capability::ViewReports, None)
}

/// Narrow a listing filter to what `actor` may see.
///
/// Listing one's own orders is always allowed, and an unscoped request from a
/// caller without `ListAllOrders` is scoped to their own orders. Asking for
/// anyone else's orders requires `ListAllOrders`.
pub fn scope_filter(actor: &Actor, filter: OrderFilter) -> Result<OrderFilter, OrderError> {
    let lists_all = grant(actor.role, Capability::ListAllOrders) == Grant::Any;

    match filter.user_id {
        Some(user_id) if user_id == actor.user_id => Ok(filter),
        None if !lists_all => Ok(filter.for_user(actor.user_id)),
        _ => {
            authorize(actor, Capability::ListAllOrders, None)?;
            Ok(filter)
        }
    }
}
