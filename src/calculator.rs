//! Attendance percentages, always derived fresh from the ledger.

use diesel::prelude::*;

use crate::error::Result;
use crate::ledger;
use crate::models::Status;
use crate::sessions;

/// Rounds `present / total` to a whole percentage, with halves rounding up.
///
/// A course with no sessions has an attendance of 0.
pub fn rounded_percentage(present: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }

    let present = present.clamp(0, total);

    // `(200p + t) / 2t` is `floor(100p/t + 1/2)` in integer arithmetic.
    ((present * 200 + total) / (total * 2)) as u8
}

/// A student's attendance percentage for a course.
///
/// The denominator is every session of the course, including ones held before the student
/// enrolled. Only [`Status::Present`] counts as attended; [`Status::Late`] does not.
pub fn percentage(conn: &mut SqliteConnection, student_id: i32, course_id: i32) -> Result<u8> {
    let total = sessions::count_for_course(conn, course_id)?;
    if total == 0 {
        return Ok(0);
    }

    let present = ledger::count_with_status(conn, student_id, course_id, Status::Present)?;

    Ok(rounded_percentage(present, total))
}

/// A breakdown of one student's attendance in one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub total_sessions: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    /// Sessions with no record for the student, e.g. ones held before they enrolled.
    pub unrecorded: usize,
    pub percentage: u8,
}

pub fn summary(
    conn: &mut SqliteConnection,
    student_id: i32,
    course_id: i32,
) -> Result<AttendanceSummary> {
    let total = sessions::count_for_course(conn, course_id)?;
    let statuses = ledger::statuses_in_course(conn, student_id, course_id)?;

    let mut summary = AttendanceSummary {
        total_sessions: total as usize,
        ..Default::default()
    };

    for status in &statuses {
        match status {
            Status::Present => summary.present += 1,
            Status::Late => summary.late += 1,
            Status::Absent => summary.absent += 1,
        }
    }

    summary.unrecorded = summary.total_sessions.saturating_sub(statuses.len());
    summary.percentage = rounded_percentage(summary.present as i64, total);

    Ok(summary)
}
