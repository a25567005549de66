use chrono::{Days, Local};
use diesel::connection::SimpleConnection;
use pretty_assertions::assert_eq;
use std::sync::Barrier;
use std::thread;

use classroll::Error;
use classroll::db;
use classroll::input::{BulkEntry, CourseFields, SessionFields, StudentDetails, parse_time};
use classroll::ledger;
use classroll::manager::AttendanceManager;
use classroll::models::{ActorId, ClassSession, Course, CourseStatus, Status, Student};
use classroll::reconcile;

const OWNER: ActorId = ActorId(1);

fn course_fields(code: &str) -> CourseFields {
    CourseFields {
        code: code.to_string(),
        name: "Intro to Rust".to_string(),
        description: None,
        schedule: "Thursdays 7pm".to_string(),
        status: CourseStatus::Active,
    }
}

fn details(number: &str) -> StudentDetails {
    StudentDetails {
        student_id: number.to_string(),
        first_name: "Ferris".to_string(),
        last_name: format!("Crab {number}"),
        email: format!("{number}@example.edu"),
        phone_number: "555-0100".to_string(),
    }
}

fn session_fields(class_name: &str) -> SessionFields {
    SessionFields {
        class_name: class_name.to_string(),
        date: Local::now().date_naive(),
        time: parse_time("19:00").unwrap(),
        room_location: "GHC 4307".to_string(),
        description: None,
    }
}

fn setup() -> (AttendanceManager, Course) {
    let mut manager = AttendanceManager::connect(":memory:").unwrap();
    let course = manager.create_course(&course_fields("98-008"), OWNER).unwrap();
    (manager, course)
}

fn join(manager: &mut AttendanceManager, course: &Course, number: &str) -> Student {
    manager
        .join_course(&course.join_code, &details(number))
        .unwrap()
        .student
}

fn create_session(manager: &mut AttendanceManager, course: &Course, name: &str) -> ClassSession {
    manager
        .create_session(course.id, &session_fields(name), OWNER)
        .unwrap()
}

fn statuses(manager: &mut AttendanceManager, session: &ClassSession) -> Vec<(i32, Status)> {
    let mut statuses: Vec<(i32, Status)> = manager
        .get_attendance_for_session(session.id, OWNER)
        .unwrap()
        .records
        .into_iter()
        .map(|(record, student)| (student.id, record.status))
        .collect();
    statuses.sort_by_key(|(student_id, _)| *student_id);
    statuses
}

#[test]
fn new_sessions_start_everyone_enrolled_as_absent() {
    let (mut manager, course) = setup();
    let a = join(&mut manager, &course, "A");
    let b = join(&mut manager, &course, "B");

    let session = create_session(&mut manager, &course, "Ownership");

    assert_eq!(
        statuses(&mut manager, &session),
        vec![(a.id, Status::Absent), (b.id, Status::Absent)]
    );

    let attendance = manager
        .get_attendance_for_session(session.id, OWNER)
        .unwrap();
    assert!(
        attendance
            .records
            .iter()
            .all(|(record, _)| record.marked_by == OWNER.0)
    );
}

#[test]
fn late_enrollees_are_backfilled_on_the_next_read() {
    let (mut manager, course) = setup();
    join(&mut manager, &course, "A");
    let session = create_session(&mut manager, &course, "Ownership");

    let late = join(&mut manager, &course, "LATE");

    let listed = manager.course_sessions(course.id).unwrap();
    assert_eq!(listed[0].records, 1, "no record before the session is read");

    let reader = ActorId(2);
    let attendance = manager.get_attendance_for_session(session.id, reader).unwrap();
    assert_eq!(attendance.records.len(), 2);

    let (record, _) = attendance
        .records
        .iter()
        .find(|(_, student)| student.id == late.id)
        .unwrap();
    assert_eq!(record.status, Status::Absent);
    assert_eq!(record.marked_by, reader.0);

    // Reading again does not create anything new.
    let again = manager.get_attendance_for_session(session.id, reader).unwrap();
    assert_eq!(again.records, attendance.records);
}

#[test]
fn student_never_marked_present_has_zero_percent() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");

    for name in ["Ownership", "Borrowing", "Lifetimes"] {
        let session = create_session(&mut manager, &course, name);
        manager
            .mark_attendance(session.id, student.id, Status::Late, OWNER)
            .unwrap();
    }

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        0
    );
}

#[test]
fn course_without_sessions_is_zero_percent() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        0
    );
}

#[test]
fn late_does_not_count_as_present() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");

    let marks = [Status::Present, Status::Present, Status::Absent, Status::Late];
    for (week, status) in marks.into_iter().enumerate() {
        let session = create_session(&mut manager, &course, &format!("Week {week}"));
        manager
            .mark_attendance(session.id, student.id, status, OWNER)
            .unwrap();
    }

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        50
    );

    let report = manager.student_report(student.id).unwrap();
    let (_, summary) = &report.courses[0];
    assert_eq!(
        (summary.present, summary.late, summary.absent),
        (2, 1, 1)
    );
    assert_eq!(summary.percentage, 50);
}

#[test]
fn sessions_before_enrollment_still_count_toward_the_total() {
    let (mut manager, course) = setup();
    create_session(&mut manager, &course, "Week 1");
    create_session(&mut manager, &course, "Week 2");

    let student = join(&mut manager, &course, "A");
    for name in ["Week 3", "Week 4"] {
        let session = create_session(&mut manager, &course, name);
        manager
            .mark_attendance(session.id, student.id, Status::Present, OWNER)
            .unwrap();
    }

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        50
    );

    let report = manager.student_report(student.id).unwrap();
    assert_eq!(report.courses[0].1.unrecorded, 2);
}

#[test]
fn percentage_follows_the_ledger_between_calls() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");
    let session = create_session(&mut manager, &course, "Ownership");

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        0
    );

    manager
        .mark_attendance(session.id, student.id, Status::Present, OWNER)
        .unwrap();

    assert_eq!(
        manager
            .get_attendance_percentage(student.id, course.id)
            .unwrap(),
        100
    );
}

#[test]
fn percentage_of_unknown_student_or_course_is_not_found() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");

    assert!(matches!(
        manager.get_attendance_percentage(4242, course.id),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        manager.get_attendance_percentage(student.id, 4242),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn bulk_mark_reports_each_entry() {
    let (mut manager, course) = setup();
    let enrolled = join(&mut manager, &course, "A");
    let other = manager
        .create_course(&course_fields("98-009"), OWNER)
        .unwrap();
    let outsider = join(&mut manager, &other, "X");
    let session = create_session(&mut manager, &course, "Ownership");

    let report = manager
        .bulk_mark_attendance(
            session.id,
            &[
                BulkEntry {
                    student_id: enrolled.id,
                    status: Status::Present,
                },
                BulkEntry {
                    student_id: outsider.id,
                    status: Status::Present,
                },
            ],
            OWNER,
        )
        .unwrap();

    assert!(report.outcomes[0].result.is_ok());
    assert!(report.outcomes[1].result.is_err());

    assert_eq!(
        statuses(&mut manager, &session),
        vec![(enrolled.id, Status::Present)]
    );
}

#[test]
fn empty_bulk_mark_is_rejected() {
    let (mut manager, course) = setup();
    let session = create_session(&mut manager, &course, "Ownership");

    assert!(matches!(
        manager.bulk_mark_attendance(session.id, &[], OWNER),
        Err(Error::Validation(_))
    ));
}

#[test]
fn only_the_course_owner_marks_attendance() {
    let (mut manager, course) = setup();
    let student = join(&mut manager, &course, "A");
    let session = create_session(&mut manager, &course, "Ownership");

    let stranger = ActorId(99);
    assert!(matches!(
        manager.mark_attendance(session.id, student.id, Status::Present, stranger),
        Err(Error::Unauthorized { .. })
    ));
    assert!(matches!(
        manager.create_session(course.id, &session_fields("Traits"), stranger),
        Err(Error::Unauthorized { .. })
    ));

    assert_eq!(
        statuses(&mut manager, &session),
        vec![(student.id, Status::Absent)]
    );
}

#[test]
fn sessions_in_the_past_are_rejected_without_side_effects() {
    let (mut manager, course) = setup();
    join(&mut manager, &course, "A");

    let mut fields = session_fields("Ownership");
    fields.date = Local::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .unwrap();

    assert!(matches!(
        manager.create_session(course.id, &fields, OWNER),
        Err(Error::Validation(_))
    ));
    assert!(manager.course_sessions(course.id).unwrap().is_empty());
}

#[test]
fn failed_default_records_roll_back_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let database_url = dir.path().join("classroll.sqlite3");
    let database_url = database_url.to_str().unwrap();

    let mut manager = AttendanceManager::connect(database_url).unwrap();
    let course = manager.create_course(&course_fields("98-008"), OWNER).unwrap();
    join(&mut manager, &course, "A");

    db::connect(database_url)
        .unwrap()
        .batch_execute(
            "CREATE TRIGGER refuse_attendance BEFORE INSERT ON attendance_records \
             BEGIN SELECT RAISE(ABORT, 'attendance is read-only'); END;",
        )
        .unwrap();

    assert!(matches!(
        manager.create_session(course.id, &session_fields("Ownership"), OWNER),
        Err(Error::Storage(_))
    ));
    assert!(manager.course_sessions(course.id).unwrap().is_empty());
}

#[test]
fn deleting_sessions_and_students_cascades_to_the_ledger() {
    let (mut manager, course) = setup();
    let a = join(&mut manager, &course, "A");
    let b = join(&mut manager, &course, "B");
    let first = create_session(&mut manager, &course, "Ownership");
    let second = create_session(&mut manager, &course, "Borrowing");

    manager.delete_session(first.id, OWNER).unwrap();
    assert!(matches!(
        manager.get_attendance_for_session(first.id, OWNER),
        Err(Error::NotFound { .. })
    ));

    manager.delete_student(b.id, OWNER).unwrap();
    assert_eq!(
        statuses(&mut manager, &second),
        vec![(a.id, Status::Absent)]
    );
}

#[test]
fn only_an_owner_of_one_of_their_courses_removes_a_student() {
    let (mut manager, course) = setup();
    let other = manager
        .create_course(&course_fields("98-009"), ActorId(2))
        .unwrap();
    let shared = join(&mut manager, &course, "A");
    join(&mut manager, &other, "A");
    let mine = join(&mut manager, &course, "B");

    assert!(matches!(
        manager.delete_student(mine.id, ActorId(2)),
        Err(Error::Unauthorized { course_id, .. }) if course_id == course.id
    ));
    assert_eq!(manager.enrolled_students(course.id).unwrap().1.len(), 2);

    // Owning any one of the student's courses is enough.
    manager.delete_student(shared.id, ActorId(2)).unwrap();
    assert_eq!(manager.enrolled_students(course.id).unwrap().1, vec![mine.clone()]);

    // Once enrolled nowhere, anyone may remove them.
    manager.delete_course(course.id, OWNER).unwrap();
    manager.delete_student(mine.id, ActorId(3)).unwrap();
}

#[test]
fn joining_reuses_students_and_refuses_duplicates() {
    let (mut manager, course) = setup();
    let other = manager
        .create_course(&course_fields("98-009"), OWNER)
        .unwrap();

    let first = join(&mut manager, &course, "A");
    let second = join(&mut manager, &other, "A");
    assert_eq!(first.id, second.id);

    assert!(matches!(
        manager.join_course(&course.join_code, &details("A")),
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        manager.join_course("nope", &details("B")),
        Err(Error::NotFound { .. })
    ));

    join(&mut manager, &other, "B");
    let (_, courses) = manager.student_courses("A").unwrap();
    let counts: Vec<(i32, usize)> = courses
        .iter()
        .map(|overview| (overview.course.id, overview.student_count))
        .collect();
    assert_eq!(counts, vec![(course.id, 1), (other.id, 2)]);
}

#[test]
fn inactive_courses_cannot_be_joined() {
    let (mut manager, course) = setup();
    manager
        .set_course_status(course.id, CourseStatus::Inactive, OWNER)
        .unwrap();

    assert!(matches!(
        manager.join_course(&course.join_code, &details("A")),
        Err(Error::Validation(_))
    ));
    // The failed join left no student behind.
    assert!(manager.search_students(Some("A"), None).unwrap().is_empty());
}

#[test]
fn importing_a_roster_enrolls_new_and_existing_students() {
    let (mut manager, course) = setup();
    join(&mut manager, &course, "A");

    let summary = manager
        .import_roster(course.id, &[details("A"), details("B"), details("C")], OWNER)
        .unwrap();

    assert_eq!(
        (summary.created, summary.enrolled, summary.already_enrolled),
        (2, 2, 1)
    );

    let (_, standings) = manager.course_report(course.id).unwrap();
    assert_eq!(standings.len(), 3);
}

#[test]
fn concurrent_reconciles_create_one_record_per_student() {
    let dir = tempfile::tempdir().unwrap();
    let database_url = dir.path().join("classroll.sqlite3");
    let database_url = database_url.to_str().unwrap();

    let mut manager = AttendanceManager::connect(database_url).unwrap();
    let course = manager.create_course(&course_fields("98-008"), OWNER).unwrap();
    let session = create_session(&mut manager, &course, "Ownership");

    let mut late = Vec::new();
    for number in ["A", "B", "C", "D", "E"] {
        late.push(join(&mut manager, &course, number).id);
    }

    let connections = [
        db::connect(database_url).unwrap(),
        db::connect(database_url).unwrap(),
    ];
    let barrier = Barrier::new(connections.len());

    let inserted: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = connections
            .into_iter()
            .enumerate()
            .map(|(i, mut conn)| {
                let (barrier, session) = (&barrier, &session);
                scope.spawn(move || {
                    barrier.wait();
                    reconcile::reconcile(&mut conn, session, ActorId(10 + i as i32))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    assert_eq!(inserted.iter().sum::<usize>(), late.len());

    let mut conn = db::connect(database_url).unwrap();
    let mut recorded = ledger::recorded_student_ids(&mut conn, session.id).unwrap();
    recorded.sort_unstable();
    late.sort_unstable();
    assert_eq!(recorded, late);
}
