// storefront/src/services/notifications.rs

//! Customer notifications.
//!
//! Flows never call a dispatcher directly. They enqueue a job on the
//! [`NotificationQueue`]; a single tokio task drains it, logs and counts every
//! failure, and never reports back into the request that queued the job.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{event, instrument, Level};

const QUEUE_CAPACITY: usize = 256;
const SENT_HISTORY: usize = 100;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
  async fn send_status_change(&self, order: &Order, new_status: OrderStatus) -> Result<()>;
}

enum NotificationJob {
  StatusChange { order: Box<Order>, new_status: OrderStatus },
  Flush { done: oneshot::Sender<()> },
}

#[derive(Default)]
struct Counters {
  sent: AtomicU64,
  failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationStats {
  pub sent: u64,
  pub failed: u64,
}

/// Handle to the notification worker. Cheap to clone.
#[derive(Clone)]
pub struct NotificationQueue {
  sender: mpsc::Sender<NotificationJob>,
  counters: Arc<Counters>,
}

impl NotificationQueue {
  /// Spawns the worker on the current tokio runtime.
  pub fn start(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
    let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
    let counters = Arc::new(Counters::default());
    tokio::spawn(run_worker(receiver, dispatcher, counters.clone()));
    Self { sender, counters }
  }

  /// Queues a status-change notification without waiting for delivery.
  pub fn enqueue_status_change(&self, order: Order, new_status: OrderStatus) -> Result<()> {
    self
      .sender
      .try_send(NotificationJob::StatusChange {
        order: Box::new(order),
        new_status,
      })
      .map_err(|e| AppError::Internal(format!("Notification queue rejected job: {}", e)))
  }

  /// Resolves once every job queued before this call has been handled.
  pub async fn flush(&self) -> Result<()> {
    let (done, wait) = oneshot::channel();
    self
      .sender
      .send(NotificationJob::Flush { done })
      .await
      .map_err(|_| AppError::Internal("Notification worker has stopped".to_string()))?;
    wait
      .await
      .map_err(|_| AppError::Internal("Notification worker has stopped".to_string()))
  }

  pub fn stats(&self) -> NotificationStats {
    NotificationStats {
      sent: self.counters.sent.load(Ordering::Relaxed),
      failed: self.counters.failed.load(Ordering::Relaxed),
    }
  }
}

#[instrument(name = "notification_worker", skip_all)]
async fn run_worker(
  mut receiver: mpsc::Receiver<NotificationJob>,
  dispatcher: Arc<dyn NotificationDispatcher>,
  counters: Arc<Counters>,
) {
  event!(Level::INFO, "Notification worker started.");
  while let Some(job) = receiver.recv().await {
    match job {
      NotificationJob::StatusChange { order, new_status } => {
        match dispatcher.send_status_change(&order, new_status).await {
          Ok(()) => {
            counters.sent.fetch_add(1, Ordering::Relaxed);
          }
          Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            event!(Level::WARN, order_id = %order.id, status = %new_status, error = %e, "Notification failed.");
          }
        }
      }
      NotificationJob::Flush { done } => {
        let _ = done.send(());
      }
    }
  }
  event!(Level::INFO, "Notification worker stopped.");
}

/// Outgoing message as the mock mailer saw it.
#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body_preview: String,
  pub message_id: String,
}

/// Logs emails instead of sending them. Recipients on the `.invalid` TLD fail,
/// which lets local runs see the failure path.
///
/// Only the most recent emails are kept for inspection; older ones are dropped.
pub struct MockEmailDispatcher {
  sender: String,
  order_link_base: Option<String>,
  history: usize,
  sent: parking_lot::Mutex<VecDeque<SentEmailInfo>>,
}

impl MockEmailDispatcher {
  pub fn new(sender: impl Into<String>) -> Self {
    Self {
      sender: sender.into(),
      order_link_base: None,
      history: SENT_HISTORY,
      sent: parking_lot::Mutex::new(VecDeque::new()),
    }
  }

  /// Keeps at most `history` sent emails.
  pub fn with_history(mut self, history: usize) -> Self {
    self.history = history;
    self
  }

  /// Adds a "view your order" link under `base_url` to every email.
  pub fn with_order_links(mut self, base_url: impl Into<String>) -> Self {
    self.order_link_base = Some(base_url.into().trim_end_matches('/').to_string());
    self
  }

  /// Recently sent emails, oldest first.
  pub fn sent(&self) -> Vec<SentEmailInfo> {
    self.sent.lock().iter().cloned().collect()
  }

  /// HTML body of a status-change email. Customer-supplied text is escaped.
  fn status_change_body(&self, order: &Order, new_status: OrderStatus) -> String {
    let mut body = format!("<p>Order <b>{}</b> moved to <b>{}</b>.</p>", order.id, new_status);
    if let Some(reason) = order.cancellation_reason.as_deref() {
      body.push_str(&format!("<p>Reason: {}</p>", escape_html(reason)));
    }
    if let Some(base) = self.order_link_base.as_deref() {
      body.push_str(&format!(
        "<p><a href=\"{}/orders/{}\">View your order</a></p>",
        escape_html(base),
        order.id
      ));
    }
    body
  }

  fn record(&self, info: SentEmailInfo) {
    let mut sent = self.sent.lock();
    sent.push_back(info);
    while sent.len() > self.history {
      sent.pop_front();
    }
  }

  async fn send_mock_email(&self, to: &str, subject: &str, html_body: &str) -> Result<SentEmailInfo> {
    event!(Level::INFO, %to, from = %self.sender, %subject, "Simulating sending email.");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    if to.ends_with(".invalid") {
      event!(Level::WARN, %to, "Simulated email failure.");
      return Err(AppError::Internal(format!("Mailbox unavailable: {}", to)));
    }

    let info = SentEmailInfo {
      to: to.to_string(),
      from: self.sender.clone(),
      subject: subject.to_string(),
      body_preview: html_body.chars().take(50).collect::<String>() + "...",
      message_id: format!("mock_email_{}", uuid::Uuid::new_v4()),
    };
    self.record(info.clone());
    Ok(info)
  }
}

/// Escapes text for use inside an HTML element or attribute.
fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      c => out.push(c),
    }
  }
  out
}

#[async_trait]
impl NotificationDispatcher for MockEmailDispatcher {
  async fn send_status_change(&self, order: &Order, new_status: OrderStatus) -> Result<()> {
    let to = order
      .notification_email()
      .ok_or_else(|| AppError::Validation(format!("Order {} has no contact email", order.id)))?;

    let subject = format!("Your order {} is now {}", order.id, new_status);
    let body = self.status_change_body(order, new_status);

    let info = self.send_mock_email(to, &subject, &body).await?;
    event!(Level::INFO, message_id = %info.message_id, order_id = %order.id, "Status change email sent.");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use uuid::Uuid;

  fn order_for(email: &str) -> Order {
    Order {
      id: Uuid::new_v4(),
      user_id: None,
      guest_email: Some(email.to_string()),
      contact_email: None,
      status: OrderStatus::Cancelled,
      items: vec![],
      cancellation_reason: Some("changed my mind".to_string()),
      address_id: None,
      total_cents: 0,
      currency: "USD".to_string(),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn queue_counts_sent_and_failed() {
    let mailer = Arc::new(MockEmailDispatcher::new("shop@example.com"));
    let queue = NotificationQueue::start(mailer.clone());

    queue.enqueue_status_change(order_for("ada@example.com"), OrderStatus::Cancelled).unwrap();
    queue.enqueue_status_change(order_for("nobody@mail.invalid"), OrderStatus::Cancelled).unwrap();
    queue.flush().await.unwrap();

    assert_eq!(queue.stats(), NotificationStats { sent: 1, failed: 1 });
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert!(sent[0].subject.contains("Cancelled"));
  }

  #[tokio::test]
  async fn only_recent_emails_are_kept() {
    let mailer = MockEmailDispatcher::new("shop@example.com").with_history(2);
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
      mailer.send_status_change(&order_for(email), OrderStatus::Cancelled).await.unwrap();
    }

    let to: Vec<_> = mailer.sent().into_iter().map(|s| s.to).collect();
    assert_eq!(to, vec!["b@example.com".to_string(), "c@example.com".to_string()]);
  }

  #[test]
  fn reason_is_escaped_in_body() {
    let mailer = MockEmailDispatcher::new("shop@example.com").with_order_links("https://shop.example.com/");
    let mut order = order_for("ada@example.com");
    order.cancellation_reason = Some("<script>alert('x')</script> & \"more\"".to_string());

    let body = mailer.status_change_body(&order, OrderStatus::Cancelled);
    assert!(!body.contains("<script>"));
    assert!(body.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; &amp; &quot;more&quot;"));
    assert!(body.contains(&format!("href=\"https://shop.example.com/orders/{}\"", order.id)));
  }
}
