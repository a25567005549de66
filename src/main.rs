use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use classroll::cli::{Cli, Command};
use classroll::display;
use classroll::input::{BulkEntry, StudentDetails};
use classroll::settings::Settings;

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads every row of a headed CSV file.
fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("could not open {}", path.display()))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("could not parse {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("could not load settings")?;
    init_tracing(&settings.log.filter);

    let mut manager = classroll::create_default_manager(&settings)?;

    match &cli.command {
        Command::AddCourse(fields) => {
            let course = manager.create_course(fields, cli.actor()?)?;
            println!(
                "Created course {} ({}) with join code {}",
                course.course_code, course.id, course.join_code
            );
        }
        Command::ListCourses => {
            let courses = manager.list_courses(cli.actor()?)?;
            display::show_courses(&courses);
        }
        Command::ShowCourse { course_id } => {
            let overview = manager.get_course(*course_id, cli.actor()?)?;
            display::show_course(&overview);
        }
        Command::UpdateCourse { course_id, fields } => {
            let course = manager.update_course(*course_id, fields, cli.actor()?)?;
            println!("Updated course {}", course.course_code);
        }
        Command::SetCourseStatus { course_id, status } => {
            let course = manager.set_course_status(*course_id, *status, cli.actor()?)?;
            println!("Course {} is now {}", course.course_code, course.status);
        }
        Command::DeleteCourse { course_id } => {
            let course = manager.delete_course(*course_id, cli.actor()?)?;
            println!("Deleted course {}", course.course_code);
        }
        Command::Join { join_code, student } => {
            let joined = manager.join_course(join_code, student)?;
            println!(
                "{} {} joined {}",
                joined.student.first_name, joined.student.last_name, joined.course.course_name
            );
        }
        Command::ImportRoster {
            course_id,
            file_path,
        } => {
            let rows: Vec<StudentDetails> = read_csv(file_path)?;
            let summary = manager.import_roster(*course_id, &rows, cli.actor()?)?;
            display::show_import_summary(&summary);
        }
        Command::ListEnrolled { course_id } => {
            let (course, students) = manager.enrolled_students(*course_id)?;
            display::show_students(&format!("Enrolled in {}", course.course_code), &students);
        }
        Command::StudentCourses { student_number } => {
            let (student, courses) = manager.student_courses(student_number)?;
            display::show_student_courses(&student, &courses);
        }
        Command::SearchStudents { term, course_id } => {
            let students = manager.search_students(term.as_deref(), *course_id)?;
            display::show_students("Students", &students);
        }
        Command::RemoveStudent { student_id } => {
            let student = manager.delete_student(*student_id, cli.actor()?)?;
            println!("Removed student {}", student.student_id);
        }
        Command::CreateSession { course_id, fields } => {
            let session = manager.create_session(*course_id, fields, cli.actor()?)?;
            println!("Created class session {}", session.id);
        }
        Command::ListSessions { course_id } => {
            let sessions = manager.course_sessions(*course_id)?;
            display::show_sessions(&sessions);
        }
        Command::DeleteSession { session_id } => {
            let session = manager.delete_session(*session_id, cli.actor()?)?;
            println!("Deleted class session {}", session.id);
        }
        Command::ShowAttendance { session_id } => {
            let attendance = manager.get_attendance_for_session(*session_id, cli.actor()?)?;
            display::show_session_attendance(&attendance);
        }
        Command::Mark {
            session_id,
            student_id,
            status,
        } => {
            let record =
                manager.mark_attendance(*session_id, *student_id, *status, cli.actor()?)?;
            println!("Marked student {} as {}", record.student_id, record.status);
        }
        Command::BulkMark {
            session_id,
            file_path,
        } => {
            let entries: Vec<BulkEntry> = read_csv(file_path)?;
            let report = manager.bulk_mark_attendance(*session_id, &entries, cli.actor()?)?;
            display::show_bulk_report(&report);
        }
        Command::Percentage {
            student_id,
            course_id,
        } => {
            let percentage = manager.get_attendance_percentage(*student_id, *course_id)?;
            println!("{percentage}%");
        }
        Command::CourseReport { course_id } => {
            let (course, standings) = manager.course_report(*course_id)?;
            display::show_course_report(&course, &standings);
        }
        Command::StudentReport { student_id } => {
            let report = manager.student_report(*student_id)?;
            display::show_student_report(&report);
        }
    }

    Ok(())
}
