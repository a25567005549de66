//! Explicit attendance marking, one student or many at a time.

use diesel::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::input::BulkEntry;
use crate::ledger;
use crate::models::{ActorId, AttendanceRecord, ClassSession, NewAttendanceRecord, Status};
use crate::roster;

/// Sets a student's status for a session, creating the record if it does not exist yet.
///
/// The student must exist and be enrolled in the session's course.
pub fn mark_one(
    conn: &mut SqliteConnection,
    session: &ClassSession,
    student_id: i32,
    status: Status,
    marker: ActorId,
) -> Result<AttendanceRecord> {
    if roster::find_student(conn, student_id)?.is_none() {
        return Err(Error::not_found("student", student_id));
    }
    if !roster::is_enrolled(conn, session.course_id, student_id)? {
        return Err(not_enrolled(session, student_id));
    }

    write(conn, session, student_id, status, marker)
}

fn write(
    conn: &mut SqliteConnection,
    session: &ClassSession,
    student_id: i32,
    status: Status,
    marker: ActorId,
) -> Result<AttendanceRecord> {
    let record = ledger::upsert(
        conn,
        &NewAttendanceRecord {
            class_session_id: session.id,
            student_id,
            status,
            marked_by: marker.0,
        },
    )?;

    debug!(session = session.id, student_id, %status, "marked attendance");
    Ok(record)
}

fn not_enrolled(session: &ClassSession, student_id: i32) -> Error {
    Error::validation(format!(
        "student {student_id} is not enrolled in course {}",
        session.course_id
    ))
}

/// The result of a single entry of a bulk update.
#[derive(Debug)]
pub struct EntryOutcome {
    pub student_id: i32,
    pub status: Status,
    pub result: Result<AttendanceRecord>,
}

/// Per-entry results of [`mark_bulk`], in the order the entries were given.
#[derive(Debug, Default)]
pub struct BulkMarkReport {
    pub outcomes: Vec<EntryOutcome>,
}

impl BulkMarkReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&EntryOutcome, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome, err)))
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Applies every entry independently.
///
/// An entry naming an unknown or unenrolled student fails on its own and the rest still apply;
/// the failure shows up in the returned report. Only a storage failure aborts the whole call, and
/// entries applied before it stay applied.
pub fn mark_bulk(
    conn: &mut SqliteConnection,
    session: &ClassSession,
    entries: &[BulkEntry],
    marker: ActorId,
) -> Result<BulkMarkReport> {
    let requested: Vec<i32> = entries.iter().map(|entry| entry.student_id).collect();
    let known: HashSet<i32> = roster::existing_student_ids(conn, &requested)?
        .into_iter()
        .collect();
    let enrolled: HashSet<i32> = roster::enrolled_student_ids(conn, session.course_id)?
        .into_iter()
        .collect();

    let mut report = BulkMarkReport::default();

    for &BulkEntry { student_id, status } in entries {
        let result = if !known.contains(&student_id) {
            Err(Error::not_found("student", student_id))
        } else if !enrolled.contains(&student_id) {
            Err(not_enrolled(session, student_id))
        } else {
            match write(conn, session, student_id, status, marker) {
                Err(err @ Error::Storage(_)) => return Err(err),
                other => other,
            }
        };

        if let Err(err) = &result {
            warn!(session = session.id, student_id, %status, "skipped bulk entry: {err}");
        }

        report.outcomes.push(EntryOutcome {
            student_id,
            status,
            result,
        });
    }

    Ok(report)
}
