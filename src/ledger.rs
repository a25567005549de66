//! The attendance ledger: one [`AttendanceRecord`] per (session, student) pair.
//!
//! The `(class_session_id, student_id)` unique constraint is the only thing that keeps concurrent
//! writers from producing duplicate records, so every write here is phrased so that the database
//! resolves a collision rather than the caller.

use diesel::prelude::*;
use diesel::result::QueryResult;

use crate::models::{AttendanceRecord, NewAttendanceRecord, Status, Student};
use crate::schema::{attendance_records, class_sessions, students};

/// Inserts the given records, silently skipping any pair that already has a record.
///
/// Returns the number of records that were actually inserted.
pub fn insert_if_absent(
    conn: &mut SqliteConnection,
    records: &[NewAttendanceRecord],
) -> QueryResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    diesel::insert_or_ignore_into(attendance_records::table)
        .values(records)
        .execute(conn)
}

/// Inserts every given record or none of them.
///
/// Unlike [`insert_if_absent`], an existing record for any pair is an error, and that error
/// rolls back the rest of the batch.
pub fn insert_all_or_nothing(
    conn: &mut SqliteConnection,
    records: &[NewAttendanceRecord],
) -> QueryResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    conn.transaction(|conn| {
        diesel::insert_into(attendance_records::table)
            .values(records)
            .execute(conn)
    })
}

/// Writes a record, overwriting the status and marker of an existing one for the same pair.
pub fn upsert(
    conn: &mut SqliteConnection,
    record: &NewAttendanceRecord,
) -> QueryResult<AttendanceRecord> {
    diesel::insert_into(attendance_records::table)
        .values(record)
        .on_conflict((
            attendance_records::class_session_id,
            attendance_records::student_id,
        ))
        .do_update()
        .set((
            attendance_records::status.eq(record.status),
            attendance_records::marked_by.eq(record.marked_by),
            attendance_records::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;

    find_record(conn, record.class_session_id, record.student_id)?.ok_or(diesel::NotFound)
}

pub fn find_record(
    conn: &mut SqliteConnection,
    session_id: i32,
    student_id: i32,
) -> QueryResult<Option<AttendanceRecord>> {
    attendance_records::table
        .filter(attendance_records::class_session_id.eq(session_id))
        .filter(attendance_records::student_id.eq(student_id))
        .select(AttendanceRecord::as_select())
        .first(conn)
        .optional()
}

/// Retrieves the ids of every student that has a record for a session.
pub fn recorded_student_ids(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> QueryResult<Vec<i32>> {
    attendance_records::table
        .filter(attendance_records::class_session_id.eq(session_id))
        .select(attendance_records::student_id)
        .load(conn)
}

/// Retrieves every record of a session together with its student, ordered by name.
pub fn session_records(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> QueryResult<Vec<(AttendanceRecord, Student)>> {
    attendance_records::table
        .inner_join(students::table)
        .filter(attendance_records::class_session_id.eq(session_id))
        .order((students::last_name, students::first_name))
        .select((AttendanceRecord::as_select(), Student::as_select()))
        .load(conn)
}

pub fn count_for_session(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<i64> {
    attendance_records::table
        .filter(attendance_records::class_session_id.eq(session_id))
        .count()
        .get_result(conn)
}

/// Counts a student's records with the given status across the sessions of one course.
pub fn count_with_status(
    conn: &mut SqliteConnection,
    student_id: i32,
    course_id: i32,
    status: Status,
) -> QueryResult<i64> {
    attendance_records::table
        .inner_join(class_sessions::table)
        .filter(attendance_records::student_id.eq(student_id))
        .filter(class_sessions::course_id.eq(course_id))
        .filter(attendance_records::status.eq(status))
        .count()
        .get_result(conn)
}

/// Retrieves the status of every record a student has across the sessions of one course.
pub fn statuses_in_course(
    conn: &mut SqliteConnection,
    student_id: i32,
    course_id: i32,
) -> QueryResult<Vec<Status>> {
    attendance_records::table
        .inner_join(class_sessions::table)
        .filter(attendance_records::student_id.eq(student_id))
        .filter(class_sessions::course_id.eq(course_id))
        .select(attendance_records::status)
        .load(conn)
}
