//! Project catalog.
//!
//! Projects are numbered densely from 1 within their event. Submission
//! requires the event's access code.

use tracing::debug;

use crate::access_code;
use crate::domain::{EventId, LedgerState, ParticipantId, Project, ProjectId, ProjectView};
use crate::error::LedgerError;
use crate::registry;

/// Register a project under `event_id`.
///
/// Checks, in order: event exists, event active, metadata non-empty,
/// access code matches.
pub fn submit(
    state: &mut LedgerState,
    event_id: EventId,
    submitter: &ParticipantId,
    metadata_ref: &str,
    access_code: &str,
) -> Result<ProjectId, LedgerError> {
    let book = registry::active_book(state, event_id)?;
    if metadata_ref.is_empty() {
        return Err(LedgerError::EmptyMetadata);
    }
    if !access_code::verify(access_code, &book.event.access_digest) {
        return Err(LedgerError::unauthorized(format!(
            "access code does not match event {}",
            event_id
        )));
    }

    let project_id = registry::increment_project_count(state, event_id)?;
    let book = registry::book_mut(state, event_id)?;
    book.projects.insert(
        project_id,
        Project {
            id: project_id,
            submitter: submitter.clone(),
            metadata_ref: metadata_ref.to_string(),
            vote_power: 0,
        },
    );

    debug!(event_id, project_id, %submitter, "project submitted");
    Ok(project_id)
}

pub fn get(
    state: &LedgerState,
    event_id: EventId,
    project_id: ProjectId,
) -> Result<ProjectView, LedgerError> {
    let book = registry::book(state, event_id)?;
    book.projects
        .get(&project_id)
        .map(|p| ProjectView::new(event_id, p))
        .ok_or(LedgerError::InvalidProjectId {
            event_id,
            project_id,
        })
}

/// Every project of an event in identifier order.
pub fn list(state: &LedgerState, event_id: EventId) -> Result<Vec<ProjectView>, LedgerError> {
    let book = registry::book(state, event_id)?;
    Ok(book
        .projects
        .values()
        .map(|p| ProjectView::new(event_id, p))
        .collect())
}
