//! The session store.

use diesel::prelude::*;
use diesel::result::QueryResult;

use crate::models::{ClassSession, NewClassSession};
use crate::schema::class_sessions;

pub fn insert_session(
    conn: &mut SqliteConnection,
    session: &NewClassSession,
) -> QueryResult<ClassSession> {
    diesel::insert_into(class_sessions::table)
        .values(session)
        .returning(ClassSession::as_returning())
        .get_result(conn)
}

pub fn find_session(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> QueryResult<Option<ClassSession>> {
    class_sessions::table
        .find(session_id)
        .select(ClassSession::as_select())
        .first(conn)
        .optional()
}

/// Retrieves every session of a course in chronological order.
pub fn course_sessions(
    conn: &mut SqliteConnection,
    course_id: i32,
) -> QueryResult<Vec<ClassSession>> {
    class_sessions::table
        .filter(class_sessions::course_id.eq(course_id))
        .order((class_sessions::date, class_sessions::time, class_sessions::id))
        .select(ClassSession::as_select())
        .load(conn)
}

/// Counts every session held for a course, whether or not any given student has a record for it.
pub fn count_for_course(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<i64> {
    class_sessions::table
        .filter(class_sessions::course_id.eq(course_id))
        .count()
        .get_result(conn)
}

/// Deletes a session along with all of its attendance records.
pub fn delete_session(conn: &mut SqliteConnection, session_id: i32) -> QueryResult<ClassSession> {
    diesel::delete(class_sessions::table.find(session_id))
        .returning(ClassSession::as_returning())
        .get_result(conn)
}
