//! The notification hub actor.
//!
//! One dispatcher task exclusively owns the subscriber set; registration, removal and
//! broadcasts all arrive as messages over a bounded channel. That single ownership replaces
//! the lock-per-call-site pattern: there is no subscriber map to guard because only the
//! dispatcher ever touches it, and per-subscriber delivery is serialized for free since the
//! dispatcher is the only sender.

use std::collections::HashMap;

use log::*;
use tokio::sync::{mpsc, oneshot};

use super::Event;

/// Capacity of each subscriber's delivery channel. A subscriber that falls this far behind
/// starts losing events instead of slowing everyone else down.
const SUBSCRIBER_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberRole {
    /// Kitchen displays; the target of role-restricted broadcasts such as `new_order`.
    Kitchen,
    /// Everything else (customer apps, dashboards). Receives unrestricted broadcasts only.
    Unrestricted,
}

impl SubscriberRole {
    /// Maps the role tag a client supplies at connect time. Anything that isn't `kitchen` is
    /// an unrestricted client.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("kitchen") {
            SubscriberRole::Kitchen
        } else {
            SubscriberRole::Unrestricted
        }
    }
}

enum HubCommand {
    Register { role: SubscriberRole, reply: oneshot::Sender<(u64, mpsc::Receiver<Event>)> },
    Unregister { id: u64 },
    Broadcast { event: Event, role: Option<SubscriberRole> },
}

struct Subscriber {
    role: SubscriberRole,
    sender: mpsc::Sender<Event>,
}

/// A clonable handle onto the hub's dispatcher task.
///
/// Publishing never blocks and never fails loudly: if the hub's inbound queue is full the
/// event is dropped with a warning. Notifications are not a durability guarantee.
#[derive(Clone)]
pub struct NotificationHub {
    commands: mpsc::Sender<HubCommand>,
}

impl NotificationHub {
    /// Spawns the dispatcher task. Must be called from within a Tokio runtime. The dispatcher
    /// shuts down once every hub handle and subscription has been dropped.
    pub fn new(buffer_size: usize) -> Self {
        let (commands, inbox) = mpsc::channel(buffer_size.max(1));
        tokio::spawn(run_dispatcher(inbox));
        Self { commands }
    }

    /// Registers a subscriber and returns its event stream. `None` if the dispatcher is gone.
    pub async fn subscribe(&self, role: SubscriberRole) -> Option<Subscription> {
        let (reply, response) = oneshot::channel();
        self.commands.send(HubCommand::Register { role, reply }).await.ok()?;
        let (id, receiver) = response.await.ok()?;
        Some(Subscription { id, receiver, commands: self.commands.clone() })
    }

    /// Delivers the event to every subscriber, regardless of role.
    pub fn broadcast(&self, event: Event) {
        self.send(HubCommand::Broadcast { event, role: None });
    }

    /// Delivers the event only to subscribers with the matching role.
    pub fn broadcast_to_role(&self, event: Event, role: SubscriberRole) {
        self.send(HubCommand::Broadcast { event, role: Some(role) });
    }

    fn send(&self, command: HubCommand) {
        if let Err(e) = self.commands.try_send(command) {
            match e {
                mpsc::error::TrySendError::Full(cmd) => {
                    if let HubCommand::Broadcast { event, .. } = cmd {
                        warn!("📣️ Hub queue is full; dropping {} event", event.kind());
                    }
                },
                mpsc::error::TrySendError::Closed(_) => warn!("📣️ Hub dispatcher has shut down"),
            }
        }
    }
}

/// A registered subscriber's receiving end. Dropping it unregisters the subscriber.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Event>,
    commands: mpsc::Sender<HubCommand>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.try_send(HubCommand::Unregister { id: self.id });
    }
}

async fn run_dispatcher(mut inbox: mpsc::Receiver<HubCommand>) {
    let mut subscribers: HashMap<u64, Subscriber> = HashMap::new();
    let mut next_id = 0u64;
    debug!("📣️ Notification hub dispatcher started");
    while let Some(command) = inbox.recv().await {
        match command {
            HubCommand::Register { role, reply } => {
                next_id += 1;
                let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
                subscribers.insert(next_id, Subscriber { role, sender });
                trace!("📣️ Subscriber #{next_id} registered as {role:?}");
                if reply.send((next_id, receiver)).is_err() {
                    subscribers.remove(&next_id);
                }
            },
            HubCommand::Unregister { id } => {
                if subscribers.remove(&id).is_some() {
                    trace!("📣️ Subscriber #{id} unregistered");
                }
            },
            HubCommand::Broadcast { event, role } => {
                let mut stale = Vec::new();
                for (id, subscriber) in &subscribers {
                    if role.map(|r| subscriber.role == r).unwrap_or(true) {
                        match subscriber.sender.try_send(event.clone()) {
                            Ok(()) => {},
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!("📣️ Subscriber #{id} is lagging; {} event dropped", event.kind());
                            },
                            Err(mpsc::error::TrySendError::Closed(_)) => stale.push(*id),
                        }
                    }
                }
                for id in stale {
                    subscribers.remove(&id);
                    trace!("📣️ Subscriber #{id} disconnected; removed during broadcast");
                }
            },
        }
    }
    debug!("📣️ Notification hub dispatcher shut down");
}
