//! Notification classification and debounced refetch dispatch.
//!
//! Real-time events never mutate the cache directly: they only mark a
//! projection as suspect, the debouncer coalesces the marks, and the
//! engine refetches the projection from the backend. Duplicate events are
//! therefore harmless by construction: both paths converge on the same
//! server state through the same read endpoints.

use crate::event_bus::EventBus;
use parts_realtime::debounce::Debouncer;
use parts_types::{ClientEvent, NotificationAction, NotificationEvent, RefetchKind, Toast};
use std::time::Duration;
use tokio::sync::mpsc;

/// Classifies incoming notifications and schedules coalesced refetches.
pub struct Reconciler {
	debouncer: Debouncer,
	event_bus: EventBus,
}

impl Reconciler {
	/// Creates a reconciler with the given coalescing window, returning
	/// the receiver on which due refetch kinds arrive.
	pub fn new(
		window: Duration,
		event_bus: EventBus,
	) -> (Self, mpsc::UnboundedReceiver<RefetchKind>) {
		let (debouncer, triggers) = Debouncer::spawn(window);
		(
			Self {
				debouncer,
				event_bus,
			},
			triggers,
		)
	}

	/// Routes one notification.
	///
	/// Refetch classes go to the debouncer, announcement types surface as
	/// toasts, and unrecognized types are dropped silently so new backend
	/// notification types never break deployed clients.
	pub fn observe(&self, event: &NotificationEvent) {
		match event.action() {
			NotificationAction::Refetch(kind) => {
				tracing::trace!(kind = %kind, notification = %event.kind, "Scheduling refetch");
				self.debouncer.schedule(kind);
			}
			NotificationAction::ToastOnly => {
				let message = event
					.title
					.clone()
					.or_else(|| event.body.clone())
					.unwrap_or_else(|| event.kind.clone());
				self.event_bus
					.publish(ClientEvent::Toast(Toast::info(message)))
					.ok();
			}
			NotificationAction::Ignore => {
				tracing::debug!(notification = %event.kind, "Ignoring unknown notification type");
			}
		}
	}
}
