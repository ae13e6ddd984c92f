use tokio::sync::mpsc::UnboundedSender;

use crate::rig::RigId;

/// Client input queued by the websocket tasks and applied at the start of the
/// next tick, so the site never mutates mid-step.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Key { code: String, down: bool },
    Focus(Option<RigId>),
}

#[derive(Default)]
pub struct SharedSiteState {
    pub tick: u64,
    pub clients: Vec<UnboundedSender<String>>,
    inbox: Vec<ClientEvent>,
}

impl SharedSiteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) {
        self.clients.push(tx);
    }

    pub fn push_event(&mut self, event: ClientEvent) {
        self.inbox.push(event);
    }

    pub fn drain_inbox(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.inbox)
    }

    /// Send one serialized snapshot to every client, dropping closed ones.
    pub fn broadcast(&mut self, json: &str) {
        self.clients.retain(|tx| tx.send(json.to_string()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_broadcast_drops_closed_clients() {
        let mut state = SharedSiteState::new();
        let (tx_open, mut rx_open) = mpsc::unbounded_channel();
        let (tx_closed, rx_closed) = mpsc::unbounded_channel();
        state.register_client(tx_open);
        state.register_client(tx_closed);
        drop(rx_closed);

        state.broadcast("{}");
        assert_eq!(state.clients.len(), 1);
        assert_eq!(rx_open.try_recv().unwrap(), "{}");
    }

    #[test]
    fn test_inbox_drains_in_order() {
        let mut state = SharedSiteState::new();
        state.push_event(ClientEvent::Key { code: "KeyW".into(), down: true });
        state.push_event(ClientEvent::Focus(Some(RigId(2))));

        let events = state.drain_inbox();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ClientEvent::Focus(Some(RigId(2))));
        assert!(state.drain_inbox().is_empty());
    }
}
