//! Table rendering for the command-line interface.

use tabled::{Table, Tabled, settings::Style};

use crate::manager::{
    CourseOverview, ImportSummary, SessionAttendance, SessionOverview, StudentReport,
    StudentStanding,
};
use crate::models::{Course, Student};
use crate::mutate::BulkMarkReport;

fn render<T: Tabled>(rows: impl IntoIterator<Item = T>) -> Table {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table
}

fn full_name(student: &Student) -> String {
    format!("{} {}", student.first_name, student.last_name)
}

#[derive(Tabled)]
struct CourseRow {
    id: i32,
    code: String,
    name: String,
    schedule: String,
    status: String,
    join_code: String,
    students: usize,
}

impl CourseRow {
    fn new(course: &Course, students: usize) -> Self {
        Self {
            id: course.id,
            code: course.course_code.clone(),
            name: course.course_name.clone(),
            schedule: course.schedule.clone(),
            status: course.status.to_string(),
            join_code: course.join_code.clone(),
            students,
        }
    }
}

/// Pretty prints a list of courses with their enrollment counts.
pub fn show_courses(courses: &[CourseOverview]) {
    let table = render(
        courses
            .iter()
            .map(|overview| CourseRow::new(&overview.course, overview.student_count)),
    );

    println!("Courses:\n{table}");
}

pub fn show_course(overview: &CourseOverview) {
    let table = render([CourseRow::new(&overview.course, overview.student_count)]);
    println!("{table}");

    if let Some(description) = &overview.course.course_description {
        println!("{description}");
    }
}

#[derive(Tabled)]
struct StudentRow {
    id: i32,
    student_id: String,
    name: String,
    email: String,
    phone_number: String,
}

impl From<&Student> for StudentRow {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            student_id: student.student_id.clone(),
            name: full_name(student),
            email: student.email.clone(),
            phone_number: student.phone_number.clone(),
        }
    }
}

/// Pretty prints a list of students.
pub fn show_students(heading: &str, students: &[Student]) {
    let table = render(students.iter().map(StudentRow::from));
    println!("{heading}:\n{table}");
}

pub fn show_student_courses(student: &Student, courses: &[CourseOverview]) {
    let table = render(
        courses
            .iter()
            .map(|overview| CourseRow::new(&overview.course, overview.student_count)),
    );
    println!("Courses of {} ({}):\n{table}", full_name(student), student.student_id);
}

#[derive(Tabled)]
struct SessionRow {
    id: i32,
    class_name: String,
    date: String,
    time: String,
    room_location: String,
    records: usize,
}

pub fn show_sessions(sessions: &[SessionOverview]) {
    let table = render(sessions.iter().map(|overview| SessionRow {
        id: overview.session.id,
        class_name: overview.session.class_name.clone(),
        date: overview.session.date.to_string(),
        time: overview.session.time.format("%H:%M").to_string(),
        room_location: overview.session.room_location.clone(),
        records: overview.records,
    }));

    println!("Sessions:\n{table}");
}

#[derive(Tabled)]
struct AttendanceRow {
    student: i32,
    student_id: String,
    name: String,
    status: String,
    marked_by: i32,
}

/// Pretty prints the attendance data for a class session.
pub fn show_session_attendance(attendance: &SessionAttendance) {
    let session = &attendance.session;

    let table = render(attendance.records.iter().map(|(record, student)| AttendanceRow {
        student: student.id,
        student_id: student.student_id.clone(),
        name: full_name(student),
        status: record.status.to_string(),
        marked_by: record.marked_by,
    }));

    println!(
        "{} on {} at {} ({}) attendance:\n{table}",
        session.class_name,
        session.date,
        session.time.format("%H:%M"),
        session.room_location
    );
}

#[derive(Tabled)]
struct EntryRow {
    student: i32,
    status: String,
    result: String,
}

pub fn show_bulk_report(report: &BulkMarkReport) {
    let table = render(report.outcomes.iter().map(|outcome| EntryRow {
        student: outcome.student_id,
        status: outcome.status.to_string(),
        result: match &outcome.result {
            Ok(_) => "ok".to_string(),
            Err(err) => err.to_string(),
        },
    }));

    println!("{table}");
}

#[derive(Tabled)]
struct StandingRow {
    id: i32,
    student_id: String,
    name: String,
    attendance: String,
}

pub fn show_course_report(course: &Course, standings: &[StudentStanding]) {
    let table = render(standings.iter().map(|standing| StandingRow {
        id: standing.student.id,
        student_id: standing.student.student_id.clone(),
        name: full_name(&standing.student),
        attendance: format!("{}%", standing.percentage),
    }));

    println!("{} attendance:\n{table}", course.course_code);
}

#[derive(Tabled)]
struct SummaryRow {
    course: String,
    sessions: usize,
    present: usize,
    late: usize,
    absent: usize,
    unrecorded: usize,
    attendance: String,
}

/// Prints a student's attendance in each of their courses.
pub fn show_student_report(report: &StudentReport) {
    let table = render(report.courses.iter().map(|(course, summary)| SummaryRow {
        course: course.course_code.clone(),
        sessions: summary.total_sessions,
        present: summary.present,
        late: summary.late,
        absent: summary.absent,
        unrecorded: summary.unrecorded,
        attendance: format!("{}%", summary.percentage),
    }));

    println!(
        "{} ({}):\n{table}",
        full_name(&report.student),
        report.student.student_id
    );
}

pub fn show_import_summary(summary: &ImportSummary) {
    println!(
        "Created {} new students, enrolled {}, {} were already enrolled.",
        summary.created, summary.enrolled, summary.already_enrolled
    );
}
