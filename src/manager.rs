use chrono::Local;
use diesel::prelude::*;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{info, instrument, warn};

use crate::calculator::{self, AttendanceSummary};
use crate::db;
use crate::error::{self, Error, Result};
use crate::input::{BulkEntry, CourseFields, SessionFields, StudentDetails};
use crate::ledger;
use crate::models::{
    ActorId, AttendanceRecord, ClassSession, Course, CourseChanges, CourseStatus, NewClassSession,
    NewCourse, NewStudent, Status, Student,
};
use crate::mutate::{self, BulkMarkReport};
use crate::reconcile;
use crate::roster;
use crate::sessions;

/// The number of characters in a course join code.
pub const JOIN_CODE_LEN: usize = 8;

/// How many freshly generated join codes to try before giving up on creating a course.
const JOIN_CODE_ATTEMPTS: usize = 5;

fn generate_join_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOIN_CODE_LEN)
        .map(char::from)
        .collect()
}

/// A course together with the number of students enrolled in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOverview {
    pub course: Course,
    pub student_count: usize,
}

/// The result of a successful self-enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedCourse {
    pub student: Student,
    pub course: Course,
}

/// A session together with how many attendance records it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOverview {
    pub session: ClassSession,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAttendance {
    pub session: ClassSession,
    pub records: Vec<(AttendanceRecord, Student)>,
}

/// A student's attendance percentage in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentStanding {
    pub student: Student,
    pub percentage: u8,
}

/// A student's attendance in every course they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentReport {
    pub student: Student,
    pub courses: Vec<(Course, AttendanceSummary)>,
}

/// What an imported roster changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Students that did not exist anywhere before the import.
    pub created: usize,
    pub enrolled: usize,
    pub already_enrolled: usize,
}

/// The manager for recording, modifying, and retrieving attendance data.
///
/// Every mutating operation takes the [`ActorId`] performing it explicitly. Operations on a
/// course's sessions and attendance require that actor to own the course.
pub struct AttendanceManager {
    db: SqliteConnection,
}

impl AttendanceManager {
    /// Wraps an already-configured connection. See [`db::connect`].
    pub fn new(db: SqliteConnection) -> Self {
        Self { db }
    }

    /// Creates a new `AttendanceManager` by connecting to the `sqlite3` instance at
    /// `database_url` and migrating it.
    pub fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(db::connect(database_url)?))
    }

    fn course(&mut self, course_id: i32) -> Result<Course> {
        roster::find_course(&mut self.db, course_id)?
            .ok_or_else(|| Error::not_found("course", course_id))
    }

    fn owned_course(&mut self, course_id: i32, actor: ActorId) -> Result<Course> {
        let course = self.course(course_id)?;

        if !course.is_owned_by(actor) {
            return Err(Error::Unauthorized { actor, course_id });
        }

        Ok(course)
    }

    fn session(&mut self, session_id: i32) -> Result<ClassSession> {
        sessions::find_session(&mut self.db, session_id)?
            .ok_or_else(|| Error::not_found("class session", session_id))
    }

    fn student(&mut self, student_id: i32) -> Result<Student> {
        roster::find_student(&mut self.db, student_id)?
            .ok_or_else(|| Error::not_found("student", student_id))
    }

    fn ensure_code_available(&mut self, code: &str, course_id: Option<i32>) -> Result<()> {
        match roster::find_course_by_code(&mut self.db, code)? {
            Some(existing) if Some(existing.id) != course_id => Err(Error::Conflict(format!(
                "course code `{code}` already exists"
            ))),
            _ => Ok(()),
        }
    }

    /// Creates a course owned by `actor`, with a freshly generated join code.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub fn create_course(&mut self, input: &CourseFields, actor: ActorId) -> Result<Course> {
        input.validate()?;
        let code = input.code.trim();
        self.ensure_code_available(code, None)?;

        for attempt in 1..=JOIN_CODE_ATTEMPTS {
            let join_code = generate_join_code();

            let new_course = NewCourse {
                course_code: code,
                course_name: input.name.trim(),
                course_description: input.description.as_deref().map(str::trim),
                schedule: input.schedule.trim(),
                status: input.status,
                join_code: &join_code,
                created_by: actor.0,
            };

            match roster::insert_course(&mut self.db, &new_course) {
                Ok(course) => {
                    info!(course = course.id, "created course");
                    return Ok(course);
                }
                // Another course took the code since the check above.
                Err(err) if error::is_unique_violation_on(&err, "courses.course_code") => {
                    return Err(Error::Conflict(format!(
                        "course code `{code}` already exists"
                    )));
                }
                Err(err) if error::is_unique_violation(&err) => {
                    warn!(attempt, "join code collision, generating another");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::Conflict(
            "could not generate a unique join code".to_string(),
        ))
    }

    /// Retrieves every course owned by `actor`.
    pub fn list_courses(&mut self, actor: ActorId) -> Result<Vec<CourseOverview>> {
        let courses = roster::owned_courses(&mut self.db, actor.0)?;
        self.overviews(courses)
    }

    fn overviews(&mut self, courses: Vec<Course>) -> Result<Vec<CourseOverview>> {
        courses
            .into_iter()
            .map(|course| -> Result<CourseOverview> {
                let student_count = roster::enrollment_count(&mut self.db, course.id)?;
                Ok(CourseOverview {
                    course,
                    student_count,
                })
            })
            .collect()
    }

    pub fn get_course(&mut self, course_id: i32, actor: ActorId) -> Result<CourseOverview> {
        let course = self.owned_course(course_id, actor)?;
        let student_count = roster::enrollment_count(&mut self.db, course.id)?;

        Ok(CourseOverview {
            course,
            student_count,
        })
    }

    /// Replaces every editable field of a course. The join code never changes.
    #[instrument(skip(self, input))]
    pub fn update_course(
        &mut self,
        course_id: i32,
        input: &CourseFields,
        actor: ActorId,
    ) -> Result<Course> {
        input.validate()?;
        self.owned_course(course_id, actor)?;
        let code = input.code.trim();
        self.ensure_code_available(code, Some(course_id))?;

        let changes = CourseChanges {
            course_code: code,
            course_name: input.name.trim(),
            course_description: input.description.as_deref().map(str::trim),
            schedule: input.schedule.trim(),
            status: input.status,
        };

        let course = roster::update_course(&mut self.db, course_id, &changes)?;
        info!("updated course");
        Ok(course)
    }

    #[instrument(skip(self))]
    pub fn set_course_status(
        &mut self,
        course_id: i32,
        status: CourseStatus,
        actor: ActorId,
    ) -> Result<Course> {
        self.owned_course(course_id, actor)?;
        let course = roster::set_course_status(&mut self.db, course_id, status)?;
        info!("updated course status");
        Ok(course)
    }

    /// Deletes a course along with its sessions, enrollments, and attendance records.
    #[instrument(skip(self))]
    pub fn delete_course(&mut self, course_id: i32, actor: ActorId) -> Result<Course> {
        self.owned_course(course_id, actor)?;
        let course = roster::delete_course(&mut self.db, course_id)?;
        info!("deleted course");
        Ok(course)
    }

    /// Enrolls a student into the active course with the given join code, creating the student
    /// if their student number has never been seen before.
    #[instrument(skip(self, details), fields(student = %details.student_id))]
    pub fn join_course(&mut self, join_code: &str, details: &StudentDetails) -> Result<JoinedCourse> {
        details.validate()?;
        let join_code = join_code.trim();

        let joined = self.db.transaction::<_, Error, _>(|conn| {
            let course = roster::find_course_by_join_code(conn, join_code)?
                .ok_or_else(|| Error::not_found("join code", join_code))?;

            if course.status != CourseStatus::Active {
                return Err(Error::validation(format!(
                    "course {} is not accepting new students",
                    course.course_code
                )));
            }

            let number = details.student_id.trim();
            let student = match roster::find_student_by_number(conn, number)? {
                Some(student) => student,
                None => roster::insert_student(
                    conn,
                    &NewStudent {
                        student_id: number,
                        first_name: details.first_name.trim(),
                        last_name: details.last_name.trim(),
                        email: details.email.trim(),
                        phone_number: details.phone_number.trim(),
                    },
                )?,
            };

            if !roster::enroll(conn, course.id, student.id)? {
                return Err(Error::Conflict(format!(
                    "student {number} is already enrolled in {}",
                    course.course_code
                )));
            }

            Ok(JoinedCourse { student, course })
        })?;

        info!(course = joined.course.id, "student joined course");
        Ok(joined)
    }

    /// Retrieves a course and everyone currently enrolled in it.
    pub fn enrolled_students(&mut self, course_id: i32) -> Result<(Course, Vec<Student>)> {
        let course = self.course(course_id)?;
        let students = roster::enrolled_students(&mut self.db, course_id)?;
        Ok((course, students))
    }

    /// Retrieves a student, by student number, and every course they are enrolled in.
    pub fn student_courses(
        &mut self,
        student_number: &str,
    ) -> Result<(Student, Vec<CourseOverview>)> {
        let student = roster::find_student_by_number(&mut self.db, student_number.trim())?
            .ok_or_else(|| Error::not_found("student", student_number))?;
        let courses = roster::student_courses(&mut self.db, student.id)?;
        Ok((student, self.overviews(courses)?))
    }

    pub fn search_students(
        &mut self,
        term: Option<&str>,
        course_id: Option<i32>,
    ) -> Result<Vec<Student>> {
        Ok(roster::search_students(&mut self.db, term, course_id)?)
    }

    /// Removes a student from the roster along with every enrollment and attendance record.
    ///
    /// The actor must own at least one of the student's courses. A student who is enrolled
    /// nowhere has no records to lose and may be removed by anyone.
    #[instrument(skip(self))]
    pub fn delete_student(&mut self, student_id: i32, actor: ActorId) -> Result<Student> {
        self.student(student_id)?;

        let courses = roster::student_courses(&mut self.db, student_id)?;
        if !courses.is_empty() && !courses.iter().any(|course| course.is_owned_by(actor)) {
            return Err(Error::Unauthorized {
                actor,
                course_id: courses[0].id,
            });
        }

        let student = roster::delete_student(&mut self.db, student_id)?;
        info!("deleted student");
        Ok(student)
    }

    /// Retrieves the attendance percentage of every student enrolled in a course.
    pub fn course_report(&mut self, course_id: i32) -> Result<(Course, Vec<StudentStanding>)> {
        let (course, students) = self.enrolled_students(course_id)?;

        let standings = students
            .into_iter()
            .map(|student| -> Result<StudentStanding> {
                let percentage = calculator::percentage(&mut self.db, student.id, course_id)?;
                Ok(StudentStanding {
                    student,
                    percentage,
                })
            })
            .collect::<Result<_>>()?;

        Ok((course, standings))
    }

    /// Retrieves a student's attendance summary for every course they are enrolled in.
    pub fn student_report(&mut self, student_id: i32) -> Result<StudentReport> {
        let student = self.student(student_id)?;
        let courses = roster::student_courses(&mut self.db, student_id)?;

        let courses = courses
            .into_iter()
            .map(|course| -> Result<(Course, AttendanceSummary)> {
                let summary = calculator::summary(&mut self.db, student_id, course.id)?;
                Ok((course, summary))
            })
            .collect::<Result<_>>()?;

        Ok(StudentReport { student, courses })
    }

    /// Enrolls every student on an imported roster into a course, creating students that do not
    /// exist yet. Either the whole roster is applied or none of it is.
    #[instrument(skip(self, roster_rows), fields(rows = roster_rows.len()))]
    pub fn import_roster(
        &mut self,
        course_id: i32,
        roster_rows: &[StudentDetails],
        actor: ActorId,
    ) -> Result<ImportSummary> {
        for row in roster_rows {
            row.validate().map_err(|err| {
                Error::validation(format!("roster row for {}: {err}", row.student_id))
            })?;
        }
        self.owned_course(course_id, actor)?;

        let summary = self.db.transaction::<_, Error, _>(|conn| {
            let mut summary = ImportSummary::default();

            for row in roster_rows {
                let number = row.student_id.trim();
                let student = match roster::find_student_by_number(conn, number)? {
                    Some(student) => student,
                    None => {
                        summary.created += 1;
                        roster::insert_student(
                            conn,
                            &NewStudent {
                                student_id: number,
                                first_name: row.first_name.trim(),
                                last_name: row.last_name.trim(),
                                email: row.email.trim(),
                                phone_number: row.phone_number.trim(),
                            },
                        )?
                    }
                };

                if roster::enroll(conn, course_id, student.id)? {
                    summary.enrolled += 1;
                } else {
                    summary.already_enrolled += 1;
                }
            }

            Ok(summary)
        })?;

        info!(?summary, "imported roster");
        Ok(summary)
    }

    /// Creates a class session and, in the same transaction, a default absent record for every
    /// student enrolled in the course right now.
    #[instrument(skip(self, input), fields(class_name = %input.class_name))]
    pub fn create_session(
        &mut self,
        course_id: i32,
        input: &SessionFields,
        actor: ActorId,
    ) -> Result<ClassSession> {
        input.validate(Local::now().date_naive())?;
        self.owned_course(course_id, actor)?;

        let (session, defaults) = self.db.immediate_transaction::<_, Error, _>(|conn| {
            let session = sessions::insert_session(
                conn,
                &NewClassSession {
                    course_id,
                    class_name: input.class_name.trim(),
                    date: input.date,
                    time: input.time,
                    room_location: input.room_location.trim(),
                    description: input.description.as_deref().map(str::trim),
                    created_by: actor.0,
                },
            )?;

            let enrolled = roster::enrolled_student_ids(conn, course_id)?;
            let defaults = reconcile::on_session_created(conn, &session, &enrolled)?;

            Ok((session, defaults))
        })?;

        info!(session = session.id, defaults, "created class session");
        Ok(session)
    }

    /// Retrieves every session of a course with its record count.
    pub fn course_sessions(&mut self, course_id: i32) -> Result<Vec<SessionOverview>> {
        self.course(course_id)?;

        sessions::course_sessions(&mut self.db, course_id)?
            .into_iter()
            .map(|session| -> Result<SessionOverview> {
                let records = ledger::count_for_session(&mut self.db, session.id)? as usize;
                Ok(SessionOverview { session, records })
            })
            .collect()
    }

    /// Deletes a session along with all of its attendance records.
    #[instrument(skip(self))]
    pub fn delete_session(&mut self, session_id: i32, actor: ActorId) -> Result<ClassSession> {
        let session = self.session(session_id)?;
        self.owned_course(session.course_id, actor)?;

        let session = sessions::delete_session(&mut self.db, session_id)?;
        info!("deleted class session");
        Ok(session)
    }

    /// Retrieves a session and all of its records, first backfilling records for anyone who
    /// enrolled after the session was created.
    #[instrument(skip(self))]
    pub fn get_attendance_for_session(
        &mut self,
        session_id: i32,
        actor: ActorId,
    ) -> Result<SessionAttendance> {
        let session = self.session(session_id)?;
        reconcile::reconcile(&mut self.db, &session, actor)?;
        let records = ledger::session_records(&mut self.db, session_id)?;

        Ok(SessionAttendance { session, records })
    }

    /// Sets one student's status for a session.
    #[instrument(skip(self))]
    pub fn mark_attendance(
        &mut self,
        session_id: i32,
        student_id: i32,
        status: Status,
        actor: ActorId,
    ) -> Result<AttendanceRecord> {
        let session = self.session(session_id)?;
        self.owned_course(session.course_id, actor)?;

        mutate::mark_one(&mut self.db, &session, student_id, status, actor)
    }

    /// Sets many students' statuses for a session. Entries succeed or fail independently; see
    /// [`mutate::mark_bulk`].
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn bulk_mark_attendance(
        &mut self,
        session_id: i32,
        entries: &[BulkEntry],
        actor: ActorId,
    ) -> Result<BulkMarkReport> {
        if entries.is_empty() {
            return Err(Error::validation("no attendance entries were given"));
        }

        let session = self.session(session_id)?;
        self.owned_course(session.course_id, actor)?;

        let report = mutate::mark_bulk(&mut self.db, &session, entries, actor)?;
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "bulk marked attendance"
        );
        Ok(report)
    }

    /// A student's attendance percentage in a course, computed from the ledger on every call.
    pub fn get_attendance_percentage(&mut self, student_id: i32, course_id: i32) -> Result<u8> {
        self.student(student_id)?;
        self.course(course_id)?;

        calculator::percentage(&mut self.db, student_id, course_id)
    }
}
