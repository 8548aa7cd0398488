//! Refetch coalescing.
//!
//! Bursts of identical notifications (a batch of new orders, repeated
//! status pushes) must not translate into one refetch per event. The
//! [`Debouncer`] owns an explicit timer task: the first event of a class
//! arms a deadline one window away, duplicates inside the window are
//! absorbed, and exactly one trigger fires when the deadline passes.
//! Distinct classes debounce independently. The timer runs on tokio time,
//! so tests drive it deterministically with a paused clock.

use parts_types::RefetchKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Handle for scheduling coalesced refetch triggers.
///
/// Dropping the debouncer stops the timer task; pending deadlines are
/// discarded, which is the right behavior on shutdown.
pub struct Debouncer {
	input: mpsc::UnboundedSender<RefetchKind>,
}

impl Debouncer {
	/// Spawns the timer task and returns the debouncer together with the
	/// receiver on which coalesced triggers arrive.
	pub fn spawn(window: Duration) -> (Self, mpsc::UnboundedReceiver<RefetchKind>) {
		let (input_tx, mut input_rx) = mpsc::unbounded_channel::<RefetchKind>();
		let (output_tx, output_rx) = mpsc::unbounded_channel::<RefetchKind>();

		tokio::spawn(async move {
			let mut pending: HashMap<RefetchKind, Instant> = HashMap::new();

			loop {
				let next_deadline = pending.values().min().copied();

				tokio::select! {
					received = input_rx.recv() => {
						match received {
							Some(kind) => {
								// First event arms the deadline; duplicates
								// inside the window do not extend it.
								pending
									.entry(kind)
									.or_insert_with(|| Instant::now() + window);
							}
							None => break,
						}
					}
					_ = sleep_until_or_forever(next_deadline) => {
						let now = Instant::now();
						let due: Vec<RefetchKind> = pending
							.iter()
							.filter(|(_, deadline)| **deadline <= now)
							.map(|(kind, _)| *kind)
							.collect();
						for kind in due {
							pending.remove(&kind);
							if output_tx.send(kind).is_err() {
								return;
							}
						}
					}
				}
			}
		});

		(Self { input: input_tx }, output_rx)
	}

	/// Schedules a refetch of the given class.
	///
	/// Cheap and non-blocking; the timer task does the coalescing.
	pub fn schedule(&self, kind: RefetchKind) {
		if self.input.send(kind).is_err() {
			tracing::debug!(kind = %kind, "Debouncer task gone, dropping trigger");
		}
	}
}

/// Sleeps until the deadline, or forever when there is none pending.
async fn sleep_until_or_forever(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::task::yield_now;
	use tokio::time::advance;

	const WINDOW: Duration = Duration::from_millis(1000);

	/// Lets the timer task observe everything scheduled so far.
	async fn settle() {
		for _ in 0..5 {
			yield_now().await;
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_burst_coalesces_to_single_trigger() {
		let (debouncer, mut triggers) = Debouncer::spawn(WINDOW);

		// Five identical events inside 200ms.
		for _ in 0..5 {
			debouncer.schedule(RefetchKind::MyBids);
			settle().await;
			advance(Duration::from_millis(50)).await;
		}

		assert_eq!(triggers.recv().await, Some(RefetchKind::MyBids));
		settle().await;
		assert!(triggers.try_recv().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_trigger_fires_at_window_not_before() {
		let (debouncer, mut triggers) = Debouncer::spawn(WINDOW);

		debouncer.schedule(RefetchKind::OpenOrders);
		settle().await;

		advance(Duration::from_millis(999)).await;
		settle().await;
		assert!(triggers.try_recv().is_err());

		advance(Duration::from_millis(1)).await;
		settle().await;
		assert_eq!(triggers.try_recv(), Ok(RefetchKind::OpenOrders));
	}

	#[tokio::test(start_paused = true)]
	async fn test_distinct_classes_debounce_independently() {
		let (debouncer, mut triggers) = Debouncer::spawn(WINDOW);

		debouncer.schedule(RefetchKind::OpenOrders);
		debouncer.schedule(RefetchKind::Wallet);
		settle().await;

		advance(WINDOW).await;
		settle().await;

		let mut fired = vec![
			triggers.try_recv().expect("first trigger"),
			triggers.try_recv().expect("second trigger"),
		];
		fired.sort_by_key(|k| format!("{}", k));
		assert_eq!(fired, vec![RefetchKind::OpenOrders, RefetchKind::Wallet]);
		assert!(triggers.try_recv().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_new_burst_after_fire_arms_again() {
		let (debouncer, mut triggers) = Debouncer::spawn(WINDOW);

		debouncer.schedule(RefetchKind::MyBids);
		settle().await;
		advance(WINDOW).await;
		settle().await;
		assert_eq!(triggers.try_recv(), Ok(RefetchKind::MyBids));

		debouncer.schedule(RefetchKind::MyBids);
		settle().await;
		advance(WINDOW).await;
		settle().await;
		assert_eq!(triggers.try_recv(), Ok(RefetchKind::MyBids));
		assert!(triggers.try_recv().is_err());
	}
}
