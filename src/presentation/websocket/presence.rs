//! Presence Store Adapter
//!
//! Joins presence state kept by [`PresenceService`] with the presence hub.
//! Presence rooms are keyed by the observed (notifier) user id and list the
//! observers' connections, so a `notify` event for user N reaches everyone
//! watching N.
//!
//! The cache-backed subscription list is authoritative: on disconnect it is
//! what tells us which notifier rooms an observer has to be removed from.
//!
//! A user counts as online while at least one of their presence sessions on
//! this process is open. Closing any other session only removes that
//! connection from the registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use super::client::Client;
use super::hub::Hub;
use super::messages::{events, PresenceEvent, PublishedMessage};
use super::registry::JoinOutcome;
use crate::application::services::PresenceService;
use crate::domain::PresenceRecord;
use crate::shared::error::AppError;

#[derive(Clone)]
pub struct Presence {
    service: Arc<PresenceService>,
    /// Open presence sessions per user
    sessions: Arc<DashMap<i64, usize>>,
}

impl Presence {
    pub fn new(service: Arc<PresenceService>) -> Self {
        Self {
            service,
            sessions: Arc::new(DashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &PresenceService {
        &self.service
    }

    /// Count a newly opened presence session of `user_id`.
    pub fn attach(&self, user_id: i64) {
        *self.sessions.entry(user_id).or_insert(0) += 1;
    }

    /// Uncount one session. Returns `true` if it was the user's last.
    fn detach(&self, user_id: i64) -> bool {
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut open) => {
                *open.get_mut() -= 1;
                if *open.get() == 0 {
                    open.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => true,
        }
    }

    /// Store the new state, refresh the cache, then publish `notify`.
    ///
    /// Nothing is published if the store rejects the write.
    pub async fn set_online_status(
        &self,
        hub: &Hub,
        user_id: i64,
        is_online: bool,
    ) -> Result<PresenceRecord, AppError> {
        let record = self.service.set_online_status(user_id, is_online).await?;

        let event = PresenceEvent {
            user_id,
            is_online,
            last_seen_at: record.last_seen_at,
        };
        hub.publish(&PublishedMessage::new(events::NOTIFY, user_id, event)?)
            .await;
        Ok(record)
    }

    /// Register `observer` in the room of every notifier.
    ///
    /// Each newly observed notifier's current state is sent to the observer
    /// as a `notify` event. Returns how many notifiers are newly observed by
    /// this connection.
    pub async fn subscribe(&self, hub: &Hub, observer: &Client, notifiers: &[i64]) -> usize {
        let mut added = 0;
        for &notifier in notifiers {
            match hub.registry().join(notifier, observer.clone()) {
                JoinOutcome::AlreadyJoined => continue,
                // The replaced connection belonged to the same observer, so
                // the cached edge is already there.
                JoinOutcome::Replaced => {}
                JoinOutcome::Joined => {
                    if let Err(e) = self.service.add_subscription(observer.user_id, notifier).await {
                        error!(
                            observer_id = observer.user_id,
                            notifier_id = notifier,
                            error = %e,
                            "Failed to record subscription"
                        );
                    }
                }
            }
            self.send_snapshot(observer, notifier).await;
            added += 1;
        }

        debug!(observer_id = observer.user_id, notifiers = ?notifiers, added = added, "Observer subscribed");
        added
    }

    /// Send the stored state of `notifier` to `observer` alone.
    async fn send_snapshot(&self, observer: &Client, notifier: i64) {
        let record = match self.service.status(notifier).await {
            Ok(record) => record,
            Err(e) => {
                warn!(notifier_id = notifier, error = %e, "Presence snapshot unavailable");
                return;
            }
        };
        let event = PresenceEvent {
            user_id: notifier,
            is_online: record.is_online,
            last_seen_at: record.last_seen_at,
        };
        let frame = PublishedMessage::new(events::NOTIFY, notifier, event)
            .and_then(|message| serde_json::to_string(&message));
        match frame {
            Ok(frame) => {
                if let Err(e) = observer.try_deliver(Arc::from(frame)) {
                    debug!(observer_id = observer.user_id, notifier_id = notifier, error = %e, "Snapshot not queued");
                }
            }
            Err(e) => error!(notifier_id = notifier, error = %e, "Failed to encode snapshot"),
        }
    }

    /// Remove `observer` from every notifier room.
    ///
    /// If this was the user's last presence session on this process, the
    /// user also goes offline and their subscription list is cleared.
    pub async fn unsubscribe(&self, hub: &Hub, observer: &Client) {
        let observer_id = observer.user_id;

        if !self.detach(observer_id) {
            let removed = hub.registry().remove_everywhere(observer.connection_id);
            debug!(
                observer_id = observer_id,
                connection_id = %observer.connection_id,
                removed = removed,
                "Presence session closed, user still connected"
            );
            return;
        }

        if let Err(e) = self.set_online_status(hub, observer_id, false).await {
            error!(observer_id = observer_id, error = %e, "Failed to set observer offline");
        }

        match self.service.subscriptions(observer_id).await {
            Ok(notifiers) => {
                for notifier in &notifiers {
                    hub.registry().remove(*notifier, observer.connection_id);
                }
                if let Err(e) = self.service.clear_subscriptions(observer_id).await {
                    error!(observer_id = observer_id, error = %e, "Failed to clear subscriptions");
                }
                info!(observer_id = observer_id, notifiers = ?notifiers, "Observer unsubscribed");
            }
            Err(e) => {
                warn!(observer_id = observer_id, error = %e, "Subscription list unavailable");
            }
        }

        // Rooms joined after the list was read, or while the cache was down.
        let stale = hub.registry().remove_everywhere(observer.connection_id);
        if stale > 0 {
            debug!(observer_id = observer_id, stale = stale, "Removed unlisted subscriptions");
        }
    }
}
