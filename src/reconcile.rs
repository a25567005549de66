//! Keeps the ledger consistent with enrollment.
//!
//! Every student enrolled in a course must end up with exactly one record for every session of
//! that course. Sessions get a default record for each student enrolled when they are created;
//! students who enroll later are backfilled the next time the session is read.

use diesel::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::Result;
use crate::ledger;
use crate::models::{ActorId, ClassSession, NewAttendanceRecord};
use crate::roster;

/// Creates the default [`Status::Absent`] record for every student in `enrolled`, marked by the
/// session's creator.
///
/// Either every record is inserted or none are. Callers run this inside the same transaction as
/// the session insert so that a failure here also undoes the session.
///
/// [`Status::Absent`]: crate::models::Status::Absent
pub fn on_session_created(
    conn: &mut SqliteConnection,
    session: &ClassSession,
    enrolled: &[i32],
) -> Result<usize> {
    let creator = ActorId(session.created_by);

    let records: Vec<NewAttendanceRecord> = enrolled
        .iter()
        .map(|&student_id| NewAttendanceRecord::absent(session.id, student_id, creator))
        .collect();

    let inserted = ledger::insert_all_or_nothing(conn, &records)?;
    debug!(session = session.id, inserted, "created default attendance records");

    Ok(inserted)
}

/// Backfills an absent record, marked by `actor`, for every student currently enrolled in the
/// session's course who does not have one yet.
///
/// Idempotent, and safe to run concurrently with itself: a record created by someone else in the
/// meantime counts as already reconciled. Returns the number of records this call created.
pub fn reconcile(
    conn: &mut SqliteConnection,
    session: &ClassSession,
    actor: ActorId,
) -> Result<usize> {
    let enrolled = roster::enrolled_student_ids(conn, session.course_id)?;
    let recorded: HashSet<i32> = ledger::recorded_student_ids(conn, session.id)?
        .into_iter()
        .collect();

    let missing: Vec<NewAttendanceRecord> = enrolled
        .into_iter()
        .filter(|student_id| !recorded.contains(student_id))
        .map(|student_id| NewAttendanceRecord::absent(session.id, student_id, actor))
        .collect();

    if missing.is_empty() {
        return Ok(0);
    }

    let inserted = ledger::insert_if_absent(conn, &missing)?;

    if inserted < missing.len() {
        debug!(
            session = session.id,
            skipped = missing.len() - inserted,
            "records were backfilled concurrently"
        );
    }
    if inserted > 0 {
        info!(session = session.id, inserted, "backfilled attendance records");
    }

    Ok(inserted)
}
