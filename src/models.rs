use crate::error::Error;
use crate::schema::{attendance_records, class_sessions, course_enrollments, courses, students};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The opaque id of whoever is performing an operation, as handed to us by the identity provider.
///
/// Stored in `created_by` and `marked_by` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub i32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The attendance status of a single student for a single class session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    Deserialize,
    clap::ValueEnum,
)]
#[diesel(sql_type = Text)]
#[serde(try_from = "String")]
pub enum Status {
    Present,
    Absent,
    Late,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
            Status::Late => "late",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            "late" => Ok(Status::Late),
            other => Err(Error::validation(format!(
                "status must be one of present, absent, late (got `{other}`)"
            ))),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ToSql<Text, Sqlite> for Status {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Status {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        text.parse().map_err(|err: Error| err.to_string().into())
    }
}

/// Whether a course currently accepts self-enrollment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    Deserialize,
    clap::ValueEnum,
)]
#[diesel(sql_type = Text)]
#[serde(try_from = "String")]
pub enum CourseStatus {
    Active,
    Inactive,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Active => "active",
            CourseStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CourseStatus::Active),
            "inactive" => Ok(CourseStatus::Inactive),
            other => Err(Error::validation(format!(
                "status must be either active or inactive (got `{other}`)"
            ))),
        }
    }
}

impl TryFrom<String> for CourseStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ToSql<Text, Sqlite> for CourseStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for CourseStatus {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        text.parse().map_err(|err: Error| err.to_string().into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Course {
    pub id: i32,
    pub course_code: String,
    pub course_name: String,
    pub course_description: Option<String>,
    pub schedule: String,
    pub status: CourseStatus,
    pub join_code: String,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

impl Course {
    pub fn is_owned_by(&self, actor: ActorId) -> bool {
        self.created_by == actor.0
    }
}

#[derive(Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourse<'a> {
    pub course_code: &'a str,
    pub course_name: &'a str,
    pub course_description: Option<&'a str>,
    pub schedule: &'a str,
    pub status: CourseStatus,
    pub join_code: &'a str,
    pub created_by: i32,
}

/// Every editable column of a course. The join code and owner are deliberately absent.
#[derive(AsChangeset)]
#[diesel(table_name = courses)]
#[diesel(treat_none_as_null = true)]
pub struct CourseChanges<'a> {
    pub course_code: &'a str,
    pub course_name: &'a str,
    pub course_description: Option<&'a str>,
    pub schedule: &'a str,
    pub status: CourseStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: i32,
    /// The institution-issued student number, unique across the roster.
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub student_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone_number: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = course_enrollments)]
pub struct NewEnrollment {
    pub course_id: i32,
    pub student_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = class_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClassSession {
    pub id: i32,
    pub course_id: i32,
    pub class_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub room_location: String,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = class_sessions)]
pub struct NewClassSession<'a> {
    pub course_id: i32,
    pub class_name: &'a str,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub room_location: &'a str,
    pub description: Option<&'a str>,
    pub created_by: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = attendance_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttendanceRecord {
    pub id: i32,
    pub class_session_id: i32,
    pub student_id: i32,
    pub status: Status,
    pub marked_by: i32,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable)]
#[diesel(table_name = attendance_records)]
pub struct NewAttendanceRecord {
    pub class_session_id: i32,
    pub student_id: i32,
    pub status: Status,
    pub marked_by: i32,
}

impl NewAttendanceRecord {
    /// The record every enrolled student starts out with.
    pub fn absent(class_session_id: i32, student_id: i32, marker: ActorId) -> Self {
        Self {
            class_session_id,
            student_id,
            status: Status::Absent,
            marked_by: marker.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Present".parse::<Status>().unwrap(), Status::Present);
        assert_eq!(" late ".parse::<Status>().unwrap(), Status::Late);
        assert_eq!("ABSENT".parse::<Status>().unwrap(), Status::Absent);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = "excused".parse::<Status>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn course_status_round_trips_through_its_text_form() {
        for status in [CourseStatus::Active, CourseStatus::Inactive] {
            assert_eq!(status.as_str().parse::<CourseStatus>().unwrap(), status);
        }
    }
}
