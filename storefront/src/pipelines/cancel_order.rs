// storefront/src/pipelines/cancel_order.rs

//! Customer-initiated order cancellation.
//!
//! Guard steps (authentication, ownership, transition) fail the request before
//! anything is written. Once the status swap is persisted, the remaining
//! steps are best-effort: stock restoration, the customer notification and
//! the expanded response can each fail without changing the outcome.

use crate::errors::{AppError, Resource, Result};
use crate::models::{Identity, Order, OrderStatus};
use crate::pipelines::contexts::{CancelOrderCtxData, RestorationFailure, RestorationReport, RestoredItem};
use crate::services::identity;
use crate::stores::ProductStore;
use std::sync::Arc;
use storeflow::{ContextData, Flows, Pipeline, SkipCondition, StepControl, StepPolicy};
use tracing::{event, instrument, Level};
use uuid::Uuid;

const MAX_SWAP_ATTEMPTS: usize = 3;

pub fn register_cancel_order_pipeline(flows: &Flows<AppError>) {
  let no_contact: SkipCondition<CancelOrderCtxData> = Arc::new(|ctx: ContextData<CancelOrderCtxData>| {
    ctx.with(|d| d.order.as_ref().map_or(true, |o| o.notification_email().is_none()))
  });

  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(&[
    ("authenticate_caller", StepPolicy::Required, None),
    ("validate_cancel_input", StepPolicy::Required, None),
    ("load_order", StepPolicy::Required, None),
    ("authorize_owner", StepPolicy::Required, None),
    ("check_transition", StepPolicy::Required, None),
    ("apply_cancellation", StepPolicy::Required, None),
    ("restore_inventory", StepPolicy::BestEffort, None),
    ("notify_customer", StepPolicy::BestEffort, Some(no_contact)),
    ("expand_order", StepPolicy::BestEffort, None),
  ]);

  p.on("authenticate_caller", authenticate_caller);
  p.on("validate_cancel_input", validate_cancel_input);
  p.on("load_order", load_order);
  p.on("authorize_owner", authorize_owner);
  p.on("check_transition", check_transition);
  p.on("apply_cancellation", apply_cancellation);
  p.on("restore_inventory", restore_inventory);
  p.on("notify_customer", notify_customer);
  p.on("expand_order", expand_order);

  flows.register(p);
  tracing::info!("Cancel-order pipeline registered.");
}

/// Registered owner by id, or guest order whose email matches the caller's.
pub fn is_owner(identity: &Identity, order: &Order) -> bool {
  let registered_owner = matches!((identity.subject_id, order.user_id), (Some(caller), Some(owner)) if caller == owner);
  let guest_owner = order.guest_email.as_deref().is_some_and(|g| identity.email_matches(g));
  registered_owner || guest_owner
}

/// `Ok` iff an order in `status` may be cancelled.
pub fn ensure_cancellable(status: OrderStatus) -> Result<()> {
  match status {
    OrderStatus::Cancelled => Err(AppError::AlreadyCancelled),
    s if s.is_cancellable() => Ok(()),
    s => Err(AppError::InvalidTransition {
      stage: s.stage_name().to_string(),
    }),
  }
}

/// Trims the reason; blank reasons count as absent.
pub fn normalize_reason(reason: Option<String>) -> Option<String> {
  reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

fn order_in(ctx: &ContextData<CancelOrderCtxData>) -> Result<Order> {
  ctx
    .with(|d| d.order.clone())
    .ok_or_else(|| AppError::Internal("Order missing from cancel context.".to_string()))
}

#[instrument(name = "cancel_order::authenticate_caller", skip_all)]
async fn authenticate_caller(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (verifier, token) = ctx.with(|d| (d.app_state.stores.identity.clone(), d.bearer_token.clone()));
  let caller = identity::authenticate(verifier.as_ref(), token.as_deref()).await?;
  ctx.update(|d| d.identity = Some(caller));
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::validate_input", skip_all)]
async fn validate_cancel_input(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (raw_id, raw_reason) = ctx.with(|d| (d.raw_order_id.clone(), d.raw_reason.clone()));

  let raw_id = raw_id
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Validation("Order ID is required".to_string()))?;
  let order_id =
    Uuid::parse_str(&raw_id).map_err(|_| AppError::Validation(format!("Invalid order ID '{}'", raw_id)))?;

  ctx.update(|d| {
    d.order_id = Some(order_id);
    d.reason = normalize_reason(raw_reason);
  });
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::load_order", skip_all)]
async fn load_order(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (orders, order_id) = ctx.with(|d| (d.app_state.stores.orders.clone(), d.order_id));
  let order_id = order_id.ok_or_else(|| AppError::Internal("Order id missing from cancel context.".to_string()))?;

  let order = orders.find_by_id(order_id).await?.ok_or_else(|| {
    event!(Level::INFO, %order_id, "Order not found for cancellation.");
    AppError::NotFound(Resource::Order)
  })?;
  event!(Level::DEBUG, %order_id, status = %order.status, items = order.items.len(), "Order loaded.");
  ctx.update(|d| d.order = Some(order));
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::authorize_owner", skip_all)]
async fn authorize_owner(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (caller, order) = ctx.with(|d| (d.identity.clone(), d.order.clone()));
  let (Some(caller), Some(order)) = (caller, order) else {
    return Err(AppError::Internal("Identity or order missing from cancel context.".to_string()));
  };

  if !is_owner(&caller, &order) {
    event!(Level::WARN, order_id = %order.id, caller = ?caller.subject_id, "Caller does not own the order.");
    return Err(AppError::Unauthorized("You are not allowed to cancel this order.".to_string()));
  }
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::check_transition", skip_all)]
async fn check_transition(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let order = order_in(&ctx)?;
  ensure_cancellable(order.status)?;
  Ok(StepControl::Continue)
}

/// Swaps the status conditionally on the status that was checked. Losing the
/// race re-reads the order: if it is still cancellable the swap is retried,
/// otherwise the caller gets the same error a fresh request would.
#[instrument(name = "cancel_order::apply_cancellation", skip_all)]
async fn apply_cancellation(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (orders, reason) = ctx.with(|d| (d.app_state.stores.orders.clone(), d.reason.clone()));
  let mut current = order_in(&ctx)?;

  for attempt in 1..=MAX_SWAP_ATTEMPTS {
    if let Some(updated) = orders
      .compare_and_set_status(current.id, current.status, OrderStatus::Cancelled, reason.clone())
      .await?
    {
      event!(Level::INFO, order_id = %updated.id, from = %current.status, attempt, "Order cancelled.");
      ctx.update(|d| d.order = Some(updated));
      return Ok(StepControl::Continue);
    }

    event!(Level::WARN, order_id = %current.id, attempt, "Order status changed concurrently; re-reading.");
    current = orders.find_by_id(current.id).await?.ok_or(AppError::NotFound(Resource::Order))?;
    ensure_cancellable(current.status)?;
  }

  Err(AppError::Internal(format!(
    "Order {} kept changing; cancellation not applied.",
    current.id
  )))
}

async fn restore_item(products: &dyn ProductStore, product_id: Uuid, quantity: i32) -> Result<RestoredItem> {
  let product = products
    .increment_stock(product_id, quantity)
    .await?
    .ok_or(AppError::NotFound(Resource::Product))?;

  let should_be_available = product.stock_quantity > 0;
  if product.is_available != should_be_available {
    products.set_availability(product_id, should_be_available).await?;
  }

  Ok(RestoredItem {
    product_id,
    quantity,
    stock_quantity: product.stock_quantity,
    is_available: should_be_available,
  })
}

#[instrument(name = "cancel_order::restore_inventory", skip_all)]
async fn restore_inventory(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let products = ctx.with(|d| d.app_state.stores.products.clone());
  let order = order_in(&ctx)?;

  let mut report = RestorationReport::default();
  for item in &order.items {
    let Some(product_id) = item.product_id.filter(|_| item.quantity > 0) else {
      report.skipped += 1;
      continue;
    };

    match restore_item(products.as_ref(), product_id, item.quantity).await {
      Ok(restored) => {
        event!(Level::DEBUG, %product_id, quantity = item.quantity, stock = restored.stock_quantity, "Stock restored.");
        report.restored.push(restored);
      }
      Err(e) => {
        event!(Level::WARN, order_id = %order.id, %product_id, quantity = item.quantity, error = %e, "Stock restoration failed.");
        report.failures.push(RestorationFailure {
          product_id: Some(product_id),
          quantity: item.quantity,
          error: e.to_string(),
        });
      }
    }
  }

  let (restored, failed) = (report.restored.len(), report.failures.len());
  ctx.update(|d| d.restoration = report);

  if failed > 0 {
    return Err(AppError::Internal(format!(
      "{} of {} line items could not be restocked",
      failed,
      restored + failed
    )));
  }
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::notify_customer", skip_all)]
async fn notify_customer(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let queue = ctx.with(|d| d.app_state.notifications.clone());
  let order = order_in(&ctx)?;
  queue.enqueue_status_change(order, OrderStatus::Cancelled)?;
  ctx.update(|d| d.notification_queued = true);
  Ok(StepControl::Continue)
}

#[instrument(name = "cancel_order::expand_order", skip_all)]
async fn expand_order(ctx: ContextData<CancelOrderCtxData>) -> Result<StepControl> {
  let (orders, order_id) = ctx.with(|d| (d.app_state.stores.orders.clone(), d.order_id));
  let order_id = order_id.ok_or_else(|| AppError::Internal("Order id missing from cancel context.".to_string()))?;

  let expanded = orders
    .find_by_id_with_expansions(order_id)
    .await?
    .ok_or_else(|| AppError::Internal(format!("Order {} disappeared before expansion", order_id)))?;
  ctx.update(|d| d.expanded = Some(expanded));
  Ok(StepControl::Continue)
}
