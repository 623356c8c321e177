//! Event registry.
//!
//! Source of truth for which events exist and whether they accept
//! activity. Identifiers come from `LedgerState::next_event_id` and are
//! never reused.

use tracing::debug;

use crate::access_code;
use crate::arithmetic::{checked_add, require_non_empty};
use crate::domain::{Event, EventBook, EventId, EventView, LedgerState, ParticipantId};
use crate::error::LedgerError;

/// Register a new event administered by `admin`. The access code is
/// stored only as a digest.
pub fn create_event(
    state: &mut LedgerState,
    admin: &ParticipantId,
    name: &str,
    access_code: &str,
) -> Result<EventId, LedgerError> {
    require_non_empty("event name", name)?;
    require_non_empty("access code", access_code)?;

    let event_id = state.next_event_id;
    let next = checked_add(event_id, 1)?;

    let event = Event {
        id: event_id,
        name: name.to_string(),
        admin: admin.clone(),
        access_digest: access_code::hash(access_code),
        active: true,
        project_count: 0,
    };
    state.events.insert(event_id, EventBook::new(event));
    state.next_event_id = next;

    debug!(event_id, %admin, name, "event created");
    Ok(event_id)
}

pub fn get_event(state: &LedgerState, event_id: EventId) -> Result<EventView, LedgerError> {
    book(state, event_id).map(|b| EventView::from(&b.event))
}

/// All events in identifier order.
pub fn list_events(state: &LedgerState) -> Vec<EventView> {
    state
        .events
        .values()
        .map(|b| EventView::from(&b.event))
        .collect()
}

/// Toggle whether the event accepts submissions and votes. Admin only.
pub fn set_active(
    state: &mut LedgerState,
    event_id: EventId,
    caller: &ParticipantId,
    value: bool,
) -> Result<(), LedgerError> {
    let book = book_mut(state, event_id)?;
    if &book.event.admin != caller {
        return Err(LedgerError::unauthorized(format!(
            "{} is not the administrator of event {}",
            caller, event_id
        )));
    }
    book.event.active = value;
    debug!(event_id, active = value, "event activity changed");
    Ok(())
}

/// Bump the project counter as part of a submission. Returns the new count.
pub(crate) fn increment_project_count(
    state: &mut LedgerState,
    event_id: EventId,
) -> Result<u64, LedgerError> {
    let book = book_mut(state, event_id)?;
    book.event.project_count = checked_add(book.event.project_count, 1)?;
    Ok(book.event.project_count)
}

pub(crate) fn book(state: &LedgerState, event_id: EventId) -> Result<&EventBook, LedgerError> {
    state
        .events
        .get(&event_id)
        .ok_or(LedgerError::NotFound { event_id })
}

pub(crate) fn book_mut(
    state: &mut LedgerState,
    event_id: EventId,
) -> Result<&mut EventBook, LedgerError> {
    state
        .events
        .get_mut(&event_id)
        .ok_or(LedgerError::NotFound { event_id })
}

/// Like [`book`], but also rejects inactive events.
pub(crate) fn active_book(state: &LedgerState, event_id: EventId) -> Result<&EventBook, LedgerError> {
    let book = book(state, event_id)?;
    if !book.event.active {
        return Err(LedgerError::Inactive { event_id });
    }
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{create_initial_state, LedgerConfig};

    fn admin() -> ParticipantId {
        ParticipantId::from("admin")
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut state = create_initial_state(&LedgerConfig::default());
        assert_eq!(create_event(&mut state, &admin(), "A", "code").unwrap(), 1);
        assert_eq!(create_event(&mut state, &admin(), "B", "code").unwrap(), 2);
        assert_eq!(state.next_event_id, 3);

        let view = get_event(&state, 2).unwrap();
        assert_eq!(view.name, "B");
        assert!(view.active);
        assert_eq!(view.project_count, 0);
    }

    #[test]
    fn empty_name_or_code_is_rejected_without_consuming_an_id() {
        let mut state = create_initial_state(&LedgerConfig::default());
        let err = create_event(&mut state, &admin(), "", "code").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        let err = create_event(&mut state, &admin(), "Name", "").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert_eq!(state.next_event_id, 1);
        assert!(state.events.is_empty());
    }

    #[test]
    fn only_admin_toggles_activity() {
        let mut state = create_initial_state(&LedgerConfig::default());
        let id = create_event(&mut state, &admin(), "A", "code").unwrap();

        let err = set_active(&mut state, id, &ParticipantId::from("mallory"), false).unwrap_err();
        assert_eq!(err.kind(), "unauthorized");
        assert!(get_event(&state, id).unwrap().active);

        set_active(&mut state, id, &admin(), false).unwrap();
        assert!(!get_event(&state, id).unwrap().active);
        assert_eq!(
            active_book(&state, id).unwrap_err(),
            LedgerError::Inactive { event_id: id }
        );
    }

    #[test]
    fn unknown_event_is_not_found() {
        let mut state = create_initial_state(&LedgerConfig::default());
        assert_eq!(get_event(&state, 9).unwrap_err(), LedgerError::NotFound { event_id: 9 });
        assert_eq!(
            set_active(&mut state, 9, &admin(), true).unwrap_err(),
            LedgerError::NotFound { event_id: 9 }
        );
    }

    #[test]
    fn stored_digest_verifies_original_code() {
        let mut state = create_initial_state(&LedgerConfig::default());
        let id = create_event(&mut state, &admin(), "A", "open-sesame").unwrap();
        let digest = &state.events[&id].event.access_digest;
        assert!(access_code::verify("open-sesame", digest));
    }
}
