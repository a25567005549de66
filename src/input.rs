//! Caller-supplied field sets and the shape checks applied to them before anything is written.

use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{CourseStatus, Status};

/// The longest value accepted for any short text column.
pub const MAX_FIELD_LEN: usize = 255;

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("please enter a {field}")));
    }
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(Error::validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

/// The editable fields of a course.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CourseFields {
    /// The unique course code, e.g. `98-008`.
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Free-form meeting schedule, e.g. `Thursdays 7pm`.
    #[arg(long)]
    pub schedule: String,

    #[arg(long, value_enum, default_value_t = CourseStatus::Active)]
    pub status: CourseStatus,
}

impl CourseFields {
    pub fn validate(&self) -> Result<()> {
        require("course code", &self.code)?;
        require("course name", &self.name)?;
        require("schedule", &self.schedule)
    }
}

/// What a student supplies when joining a course, and one row of an imported roster.
#[derive(Args, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StudentDetails {
    /// The institution-issued student number.
    #[arg(long)]
    pub student_id: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub phone_number: String,
}

impl StudentDetails {
    pub fn validate(&self) -> Result<()> {
        require("first name", &self.first_name)?;
        require("last name", &self.last_name)?;
        require("student ID", &self.student_id)?;
        require("email address", &self.email)?;
        require("phone number", &self.phone_number)?;

        // Only rejects obvious typos; whether the address exists is not checked here.
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(Error::validation("please enter a valid email address")),
        }
    }
}

/// The fields of a new class session.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SessionFields {
    #[arg(long)]
    pub class_name: String,

    /// The day of the session, as `YYYY-MM-DD`.
    #[arg(long)]
    pub date: NaiveDate,

    /// The start time, as `HH:MM`.
    #[arg(long, value_parser = parse_time)]
    pub time: NaiveTime,

    #[arg(long)]
    pub room_location: String,

    #[arg(long)]
    pub description: Option<String>,
}

impl SessionFields {
    /// Checks the fields, rejecting sessions dated before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        require("class name", &self.class_name)?;
        require("room/location", &self.room_location)?;

        if self.date < today {
            return Err(Error::validation("date must be today or in the future"));
        }

        Ok(())
    }
}

/// Parses a 24-hour `HH:MM` time.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| Error::validation(format!("time must be formatted as HH:MM (got `{s}`)")))
}

/// One line of a bulk attendance update.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkEntry {
    /// The internal id of the student.
    pub student_id: i32,
    pub status: Status,
}
