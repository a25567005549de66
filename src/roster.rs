//! The roster store: courses, students, and the enrollments between them.
//!
//! Every function here is a single query (or a short sequence of them) against an explicit
//! connection, returning plain values. Nothing here knows about attendance.

use diesel::prelude::*;
use diesel::result::QueryResult;

use crate::models::{
    Course, CourseChanges, CourseStatus, NewCourse, NewEnrollment, NewStudent, Student,
};
use crate::schema::{course_enrollments, courses, students};

/// Inserts a course and returns it as stored.
pub fn insert_course(conn: &mut SqliteConnection, course: &NewCourse) -> QueryResult<Course> {
    diesel::insert_into(courses::table)
        .values(course)
        .returning(Course::as_returning())
        .get_result(conn)
}

pub fn find_course(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<Option<Course>> {
    courses::table
        .find(course_id)
        .select(Course::as_select())
        .first(conn)
        .optional()
}

pub fn find_course_by_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> QueryResult<Option<Course>> {
    courses::table
        .filter(courses::course_code.eq(code))
        .select(Course::as_select())
        .first(conn)
        .optional()
}

pub fn find_course_by_join_code(
    conn: &mut SqliteConnection,
    join_code: &str,
) -> QueryResult<Option<Course>> {
    courses::table
        .filter(courses::join_code.eq(join_code))
        .select(Course::as_select())
        .first(conn)
        .optional()
}

/// Retrieves every course created by `owner`, oldest first.
pub fn owned_courses(conn: &mut SqliteConnection, owner: i32) -> QueryResult<Vec<Course>> {
    courses::table
        .filter(courses::created_by.eq(owner))
        .order(courses::id)
        .select(Course::as_select())
        .load(conn)
}

pub fn update_course(
    conn: &mut SqliteConnection,
    course_id: i32,
    changes: &CourseChanges,
) -> QueryResult<Course> {
    diesel::update(courses::table.find(course_id))
        .set(changes)
        .returning(Course::as_returning())
        .get_result(conn)
}

pub fn set_course_status(
    conn: &mut SqliteConnection,
    course_id: i32,
    status: CourseStatus,
) -> QueryResult<Course> {
    diesel::update(courses::table.find(course_id))
        .set(courses::status.eq(status))
        .returning(Course::as_returning())
        .get_result(conn)
}

/// Deletes a course. Its sessions, enrollments, and attendance records go with it.
pub fn delete_course(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<Course> {
    diesel::delete(courses::table.find(course_id))
        .returning(Course::as_returning())
        .get_result(conn)
}

pub fn insert_student(conn: &mut SqliteConnection, student: &NewStudent) -> QueryResult<Student> {
    diesel::insert_into(students::table)
        .values(student)
        .returning(Student::as_returning())
        .get_result(conn)
}

pub fn find_student(conn: &mut SqliteConnection, student_id: i32) -> QueryResult<Option<Student>> {
    students::table
        .find(student_id)
        .select(Student::as_select())
        .first(conn)
        .optional()
}

/// Looks a student up by their institution-issued student number.
pub fn find_student_by_number(
    conn: &mut SqliteConnection,
    number: &str,
) -> QueryResult<Option<Student>> {
    students::table
        .filter(students::student_id.eq(number))
        .select(Student::as_select())
        .first(conn)
        .optional()
}

/// Retrieves the ids of the given students that exist.
pub fn existing_student_ids(
    conn: &mut SqliteConnection,
    student_ids: &[i32],
) -> QueryResult<Vec<i32>> {
    students::table
        .filter(students::id.eq_any(student_ids))
        .select(students::id)
        .load(conn)
}

/// Searches students whose name, email, or student number contains `term`, optionally only
/// those enrolled in `course_id`.
pub fn search_students(
    conn: &mut SqliteConnection,
    term: Option<&str>,
    course_id: Option<i32>,
) -> QueryResult<Vec<Student>> {
    let mut query = students::table.into_boxed();

    if let Some(term) = term.map(str::trim).filter(|term| !term.is_empty()) {
        let pattern = format!("%{term}%");
        query = query.filter(
            students::first_name
                .like(pattern.clone())
                .or(students::last_name.like(pattern.clone()))
                .or(students::email.like(pattern.clone()))
                .or(students::student_id.like(pattern)),
        );
    }

    if let Some(course_id) = course_id {
        let enrolled = enrolled_student_ids(conn, course_id)?;
        query = query.filter(students::id.eq_any(enrolled));
    }

    query
        .order((students::last_name, students::first_name))
        .select(Student::as_select())
        .load(conn)
}

/// Removes a student. Their enrollments and attendance records go with them.
pub fn delete_student(conn: &mut SqliteConnection, student_id: i32) -> QueryResult<Student> {
    diesel::delete(students::table.find(student_id))
        .returning(Student::as_returning())
        .get_result(conn)
}

/// Enrolls a student in a course. Returns `false` if they were already enrolled.
pub fn enroll(conn: &mut SqliteConnection, course_id: i32, student_id: i32) -> QueryResult<bool> {
    let inserted = diesel::insert_or_ignore_into(course_enrollments::table)
        .values(NewEnrollment {
            course_id,
            student_id,
        })
        .execute(conn)?;

    Ok(inserted == 1)
}

pub fn is_enrolled(
    conn: &mut SqliteConnection,
    course_id: i32,
    student_id: i32,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        course_enrollments::table.find((course_id, student_id)),
    ))
    .get_result(conn)
}

/// Retrieves the ids of every student currently enrolled in a course.
pub fn enrolled_student_ids(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<Vec<i32>> {
    course_enrollments::table
        .filter(course_enrollments::course_id.eq(course_id))
        .select(course_enrollments::student_id)
        .load(conn)
}

/// Retrieves every student currently enrolled in a course, ordered by name.
pub fn enrolled_students(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<Vec<Student>> {
    students::table
        .inner_join(course_enrollments::table)
        .filter(course_enrollments::course_id.eq(course_id))
        .order((students::last_name, students::first_name))
        .select(Student::as_select())
        .load(conn)
}

pub fn enrollment_count(conn: &mut SqliteConnection, course_id: i32) -> QueryResult<usize> {
    course_enrollments::table
        .filter(course_enrollments::course_id.eq(course_id))
        .count()
        .get_result(conn)
        .map(|count: i64| count as usize)
}

/// Retrieves every course a student is enrolled in.
pub fn student_courses(conn: &mut SqliteConnection, student_id: i32) -> QueryResult<Vec<Course>> {
    courses::table
        .inner_join(course_enrollments::table)
        .filter(course_enrollments::student_id.eq(student_id))
        .order(courses::id)
        .select(Course::as_select())
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, new_course, new_student};
    use pretty_assertions::assert_eq;

    #[test]
    fn enrolling_twice_is_reported_not_duplicated() {
        let mut conn = memory_db();
        let course = new_course(&mut conn, "98-008", 1);
        let student = new_student(&mut conn, "S1");

        assert!(enroll(&mut conn, course.id, student.id).unwrap());
        assert!(!enroll(&mut conn, course.id, student.id).unwrap());
        assert_eq!(enrollment_count(&mut conn, course.id).unwrap(), 1);
        assert!(is_enrolled(&mut conn, course.id, student.id).unwrap());
    }

    #[test]
    fn search_matches_any_name_field_within_a_course() {
        let mut conn = memory_db();
        let course = new_course(&mut conn, "98-008", 1);
        let alice = new_student(&mut conn, "alice-1");
        let bob = new_student(&mut conn, "bob-2");
        enroll(&mut conn, course.id, alice.id).unwrap();

        let everyone = search_students(&mut conn, None, None).unwrap();
        assert_eq!(everyone.len(), 2);

        let bobs = search_students(&mut conn, Some("bob"), None).unwrap();
        assert_eq!(bobs, vec![bob.clone()]);

        let in_course = search_students(&mut conn, None, Some(course.id)).unwrap();
        assert_eq!(in_course, vec![alice]);

        let none = search_students(&mut conn, Some("bob"), Some(course.id)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn deleting_a_course_drops_its_enrollments() {
        let mut conn = memory_db();
        let course = new_course(&mut conn, "98-008", 1);
        let student = new_student(&mut conn, "S1");
        enroll(&mut conn, course.id, student.id).unwrap();

        delete_course(&mut conn, course.id).unwrap();

        assert!(student_courses(&mut conn, student.id).unwrap().is_empty());
        assert!(find_student(&mut conn, student.id).unwrap().is_some());
    }
}
