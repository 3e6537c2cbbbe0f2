use log::{debug, info, warn};
use serde_json::Value;

use super::envelope::display_field;
use super::{Connection, ConnectionId, Envelope, Registry};
use crate::{CommandRelay, SEND_CMD};

/// Routes envelopes to every registered connection except the sender.
///
/// The router never inspects `dest` beyond copying it onto the outbound frame, and
/// never buffers: a connection registered after a command was routed will not see it.
#[derive(Default)]
pub struct RelayRouter {
    registry: Registry,
}

impl RelayRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// The routing step. Returns the number of peers the delivery was queued for.
    pub fn route(&self, from: ConnectionId, payload: Option<Value>) -> usize {
        let Some(envelope) = Envelope::from_payload(payload) else {
            return 0;
        };

        info!(
            "send_cmd: {} {} {}",
            display_field(envelope.source.as_ref()),
            display_field(envelope.dest.as_ref()),
            envelope.command_label().unwrap_or("-")
        );
        if envelope.dest.as_ref().and_then(Value::as_str) == Some(SEND_CMD) {
            warn!("Connection {} addressed a command to the reserved {} tag", from, SEND_CMD);
        }

        let frame = envelope.delivery().to_frame();
        self.registry.broadcast_except(from, &frame)
    }
}

impl CommandRelay for RelayRouter {
    fn on_connect(&self, conn: Connection) {
        debug!("Registering connection {}", conn.id());
        self.registry.insert(conn);
    }

    fn on_disconnect(&self, id: ConnectionId) {
        if self.registry.remove(id) {
            debug!("Removed connection {}", id);
        }
    }

    fn on_command(&self, from: ConnectionId, payload: Option<Value>) {
        self.route(from, payload);
    }
}
