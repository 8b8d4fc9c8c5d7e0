use crate::models::ServerEvent;
use crate::room::PushSender;

/// Fans one server event out to a set of push connections, ignoring any
/// connection whose outbound queue has already gone away (it is mid-teardown
/// and will be cleaned up by its own disconnect handler).
pub fn fan_out(senders: &[PushSender], event: ServerEvent) {
    for tx in senders {
        let _ = tx.send(event.clone());
    }
}

/// Sends one server event to a single push connection, same semantics.
pub fn send_one(sender: &PushSender, event: ServerEvent) {
    let _ = sender.send(event);
}
