//! This module contains the command-line interface [`Cli`] parser for managing courses, class
//! sessions, and attendance records.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::input::{CourseFields, SessionFields, StudentDetails};
use crate::models::{ActorId, CourseStatus, Status};

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "classroll", version, about)]
pub struct Cli {
    /// The id of the user performing the command. Required by every command that writes.
    #[arg(long, global = true, env = "CLASSROLL_ACTOR")]
    pub actor: Option<i32>,

    /// The different commands available for managing courses and attendance.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn actor(&self) -> anyhow::Result<ActorId> {
        self.actor
            .map(ActorId)
            .ok_or_else(|| anyhow::anyhow!("this command needs an actor; pass --actor <ID>"))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new course owned by the actor.
    AddCourse(CourseFields),

    /// List the courses owned by the actor.
    ListCourses,

    /// Show one of the actor's courses.
    ShowCourse { course_id: i32 },

    /// Replace the details of a course.
    UpdateCourse {
        course_id: i32,
        #[command(flatten)]
        fields: CourseFields,
    },

    /// Open or close a course to new students.
    SetCourseStatus {
        course_id: i32,
        #[arg(value_enum)]
        status: CourseStatus,
    },

    /// Delete a course with all of its sessions and attendance.
    DeleteCourse { course_id: i32 },

    /// Join a course with its join code.
    Join {
        join_code: String,
        #[command(flatten)]
        student: StudentDetails,
    },

    /// Enroll every student of a CSV roster into a course.
    ImportRoster { course_id: i32, file_path: PathBuf },

    /// List the students enrolled in a course.
    ListEnrolled { course_id: i32 },

    /// List the courses a student is enrolled in, by student number.
    StudentCourses { student_number: String },

    /// Search students by name, email, or student number.
    SearchStudents {
        term: Option<String>,
        #[arg(long)]
        course_id: Option<i32>,
    },

    /// Remove a student and all of their attendance.
    RemoveStudent { student_id: i32 },

    /// Schedule a class session for a course.
    CreateSession {
        course_id: i32,
        #[command(flatten)]
        fields: SessionFields,
    },

    /// List the sessions of a course.
    ListSessions { course_id: i32 },

    /// Delete a class session with all of its attendance.
    DeleteSession { session_id: i32 },

    /// Show the attendance of a class session.
    ShowAttendance { session_id: i32 },

    /// Mark one student's attendance for a class session.
    Mark {
        session_id: i32,
        student_id: i32,
        #[arg(value_enum)]
        status: Status,
    },

    /// Mark attendance for a class session from a `student_id,status` CSV file.
    BulkMark { session_id: i32, file_path: PathBuf },

    /// Show a student's attendance percentage in a course.
    Percentage { student_id: i32, course_id: i32 },

    /// Show every enrolled student's attendance percentage in a course.
    CourseReport { course_id: i32 },

    /// Show a student's attendance in each of their courses.
    StudentReport { student_id: i32 },
}
