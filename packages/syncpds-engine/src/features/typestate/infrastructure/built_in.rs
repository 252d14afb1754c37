/*
 * Built-in Protocols
 *
 * - FileProtocol: open/close lifecycle
 * - LockProtocol: acquire/release lifecycle
 * - ConnectionProtocol: connect/authenticate/disconnect lifecycle
 */

use crate::features::typestate::domain::{Action, Protocol, State};

/// File protocol
///
/// ```text
/// Closed --open()--> Open --read()/write()/flush()--> Open --close()--> Closed
/// ```
///
/// Final states: {Closed}
pub struct FileProtocol;

impl FileProtocol {
    pub fn define() -> Protocol {
        let mut protocol = Protocol::new("File");

        let closed = State::new("Closed");
        let open = State::new("Open");

        protocol.set_initial_state(closed.clone());
        protocol.add_final_state(closed.clone());

        protocol.add_transition(closed.clone(), Action::new("open"), open.clone());
        for action in ["read", "write", "seek", "flush"] {
            protocol.add_transition(open.clone(), Action::new(action), open.clone());
            protocol.add_precondition(Action::new(action), open.clone());
        }
        protocol.add_transition(open, Action::new("close"), closed);

        protocol
    }
}

/// Lock protocol
///
/// ```text
/// Unlocked --acquire()--> Locked --release()--> Unlocked
/// ```
///
/// A second `acquire()` (deadlock) or a `release()` of an unlocked lock
/// ends in the error state.
pub struct LockProtocol;

impl LockProtocol {
    pub fn define() -> Protocol {
        let mut protocol = Protocol::new("Lock");

        let unlocked = State::new("Unlocked");
        let locked = State::new("Locked");

        protocol.set_initial_state(unlocked.clone());
        protocol.add_final_state(unlocked.clone());

        protocol.add_transition(unlocked.clone(), Action::new("acquire"), locked.clone());
        protocol.add_transition(locked.clone(), Action::new("release"), unlocked);

        protocol.add_precondition(Action::new("release"), locked);

        protocol
    }
}

/// Connection protocol
///
/// ```text
/// Disconnected --connect()--> Connected --authenticate()--> Authenticated
/// Authenticated --send()/receive()--> Authenticated
/// Connected | Authenticated --disconnect()--> Disconnected
/// ```
pub struct ConnectionProtocol;

impl ConnectionProtocol {
    pub fn define() -> Protocol {
        let mut protocol = Protocol::new("Connection");

        let disconnected = State::new("Disconnected");
        let connected = State::new("Connected");
        let authenticated = State::new("Authenticated");

        protocol.set_initial_state(disconnected.clone());
        protocol.add_final_state(disconnected.clone());

        protocol.add_transition(
            disconnected.clone(),
            Action::new("connect"),
            connected.clone(),
        );
        protocol.add_transition(
            connected.clone(),
            Action::new("authenticate"),
            authenticated.clone(),
        );
        for action in ["send", "receive"] {
            protocol.add_transition(
                authenticated.clone(),
                Action::new(action),
                authenticated.clone(),
            );
            protocol.add_precondition(Action::new(action), authenticated.clone());
        }
        protocol.add_transition(
            authenticated,
            Action::new("disconnect"),
            disconnected.clone(),
        );
        protocol.add_transition(connected, Action::new("disconnect"), disconnected);

        protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_protocol_transitions() {
        let protocol = FileProtocol::define();

        let closed = State::new("Closed");
        let open = State::new("Open");

        assert_eq!(protocol.initial_state(), closed);
        assert!(protocol.can_transition(&closed, &Action::new("open"), &open));
        assert!(protocol.can_transition(&open, &Action::new("read"), &open));
        assert!(protocol.can_transition(&open, &Action::new("close"), &closed));

        assert_eq!(protocol.next_state(&closed, &Action::new("read")), None);
        assert_eq!(
            protocol.step(&closed, &Action::new("read")),
            protocol.error_state
        );
    }

    #[test]
    fn test_lock_protocol_double_acquire() {
        let protocol = LockProtocol::define();

        let locked = State::new("Locked");

        assert!(protocol.is_final_state(&State::new("Unlocked")));
        assert!(!protocol.is_final_state(&locked));
        assert_eq!(
            protocol.step(&locked, &Action::new("acquire")),
            protocol.error_state
        );
    }

    #[test]
    fn test_connection_send_before_authenticate() {
        let protocol = ConnectionProtocol::define();

        let connected = State::new("Connected");

        assert_eq!(protocol.next_state(&connected, &Action::new("send")), None);
        assert!(protocol.tracks("send"));
    }

    #[test]
    fn test_all_protocols_validate() {
        assert!(FileProtocol::define().validate().is_ok());
        assert!(LockProtocol::define().validate().is_ok());
        assert!(ConnectionProtocol::define().validate().is_ok());
    }
}
