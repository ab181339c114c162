//! Host LMS collaborators: calendar, gradebook and course cache.
//!
//! The sync job and the instance lifecycle only talk to the host through
//! these traits. The `Memory*` implementations keep everything in process
//! and back the command line tool and the tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

use quickom_core::{MeetingRecord, strip_markup};

use crate::error::CollaboratorError;

/// Module name used to key calendar events and grade items.
pub const MODULE_NAME: &str = "quickom";

/// Calendar event mirrored from a meeting record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub module_name: &'static str,
    pub instance: i64,
    pub course_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<i32>,
    pub time_start: i64,
    pub time_duration: i64,
    /// Recurring meetings have no meaningful date and stay hidden.
    pub visible: bool,
}

impl CalendarEvent {
    /// Builds the event for `record`.
    pub fn from_record(record: &MeetingRecord) -> Self {
        let intro = record.intro.clone().filter(|i| !i.is_empty());
        Self {
            module_name: MODULE_NAME,
            instance: record.id,
            course_id: record.course,
            name: record.name.clone(),
            format: intro.as_ref().map(|_| record.intro_format),
            description: intro,
            time_start: record.start_time,
            time_duration: record.duration,
            visible: !record.recurring,
        }
    }
}

/// How a grade item is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradeType {
    None,
    Value { grade_max: i64, grade_min: i64 },
    Scale { scale_id: i64 },
}

impl GradeType {
    /// Decodes the record grade setting.
    pub fn from_setting(grade: i64) -> Self {
        match grade {
            g if g > 0 => Self::Value {
                grade_max: g,
                grade_min: 0,
            },
            g if g < 0 => Self::Scale { scale_id: -g },
            _ => Self::None,
        }
    }
}

/// Gradebook item for a meeting instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeItem {
    pub course_id: i64,
    pub module_name: &'static str,
    pub instance: i64,
    pub item_name: String,
    pub grade_type: GradeType,
}

impl GradeItem {
    /// Builds the grade item for `record`.
    pub fn from_record(record: &MeetingRecord) -> Self {
        Self {
            course_id: record.course,
            module_name: MODULE_NAME,
            instance: record.id,
            item_name: strip_markup(&record.name),
            grade_type: GradeType::from_setting(record.grade),
        }
    }
}

/// Host calendar.
pub trait CalendarSink: Send + Sync {
    /// Creates or replaces the event for `event.instance`.
    fn upsert_event(&self, event: &CalendarEvent) -> Result<(), CollaboratorError>;

    /// Removes the event of an instance.
    fn delete_event(&self, instance: i64) -> Result<(), CollaboratorError>;
}

/// Host gradebook.
pub trait GradeBook: Send + Sync {
    /// Creates or replaces the grade item.
    fn upsert_item(&self, item: &GradeItem) -> Result<(), CollaboratorError>;

    /// Removes the grade item of an instance.
    fn delete_item(&self, course_id: i64, instance: i64) -> Result<(), CollaboratorError>;

    /// Records a raw grade for one user.
    fn set_grade(
        &self,
        course_id: i64,
        instance: i64,
        user_id: i64,
        grade: i64,
    ) -> Result<(), CollaboratorError>;
}

/// Host course module cache.
pub trait CourseCache: Send + Sync {
    /// Drops the cached module info of a course.
    fn invalidate(&self, course_id: i64);
}

/// Host user accounts.
pub trait UserDirectory: Send + Sync {
    /// Local user id for an email address, if any.
    fn find_by_email(&self, email: &str) -> Option<i64>;
}

/// In-process calendar.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: Mutex<BTreeMap<i64, CalendarEvent>>,
    upserts: Mutex<usize>,
}

impl MemoryCalendar {
    /// Creates an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current event of an instance.
    pub fn event(&self, instance: i64) -> Option<CalendarEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&instance)
            .cloned()
    }

    /// Number of upserts received.
    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CalendarSink for MemoryCalendar {
    fn upsert_event(&self, event: &CalendarEvent) -> Result<(), CollaboratorError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(event.instance, event.clone());
        *self.upserts.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn delete_event(&self, instance: i64) -> Result<(), CollaboratorError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&instance);
        Ok(())
    }
}

/// In-process gradebook.
#[derive(Debug, Default)]
pub struct MemoryGradeBook {
    items: Mutex<BTreeMap<(i64, i64), GradeItem>>,
    grades: Mutex<BTreeMap<(i64, i64, i64), i64>>,
}

impl MemoryGradeBook {
    /// Creates an empty gradebook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grade item of an instance.
    pub fn item(&self, course_id: i64, instance: i64) -> Option<GradeItem> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(course_id, instance))
            .cloned()
    }

    /// Grade of one user.
    pub fn grade(&self, course_id: i64, instance: i64, user_id: i64) -> Option<i64> {
        self.grades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(course_id, instance, user_id))
            .copied()
    }
}

impl GradeBook for MemoryGradeBook {
    fn upsert_item(&self, item: &GradeItem) -> Result<(), CollaboratorError> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((item.course_id, item.instance), item.clone());
        Ok(())
    }

    fn delete_item(&self, course_id: i64, instance: i64) -> Result<(), CollaboratorError> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(course_id, instance));
        self.grades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|&(c, i, _), _| !(c == course_id && i == instance));
        Ok(())
    }

    fn set_grade(
        &self,
        course_id: i64,
        instance: i64,
        user_id: i64,
        grade: i64,
    ) -> Result<(), CollaboratorError> {
        if self.item(course_id, instance).is_none() {
            return Err(CollaboratorError(format!(
                "no grade item for {} instance {}",
                MODULE_NAME, instance
            )));
        }
        self.grades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((course_id, instance, user_id), grade);
        Ok(())
    }
}

/// In-process course cache that records invalidations.
#[derive(Debug, Default)]
pub struct MemoryCourseCache {
    invalidated: Mutex<Vec<i64>>,
}

impl MemoryCourseCache {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Courses invalidated so far, in call order.
    pub fn invalidated(&self) -> Vec<i64> {
        self.invalidated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CourseCache for MemoryCourseCache {
    fn invalidate(&self, course_id: i64) {
        self.invalidated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(course_id);
    }
}

/// In-process user directory keyed by lowercase email.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: BTreeMap<String, i64>,
}

impl MemoryUserDirectory {
    /// Creates a directory from `(email, user id)` pairs.
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        Self {
            users: users
                .into_iter()
                .map(|(email, id)| (email.as_ref().to_lowercase(), id))
                .collect(),
        }
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn find_by_email(&self, email: &str) -> Option<i64> {
        self.users.get(&email.trim().to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_event_from_scheduled_record() {
        let mut record = MeetingRecord::new(4, "Algebra")
            .with_schedule(1_585_540_980, 3600)
            .with_intro("<p>Chapter 4</p>");
        record.id = 9;

        insta::assert_json_snapshot!(CalendarEvent::from_record(&record), @r###"
        {
          "module_name": "quickom",
          "instance": 9,
          "course_id": 4,
          "name": "Algebra",
          "description": "<p>Chapter 4</p>",
          "format": 1,
          "time_start": 1585540980,
          "time_duration": 3600,
          "visible": true
        }
        "###);
    }

    #[test]
    fn recurring_events_are_hidden() {
        let record = MeetingRecord::new(4, "Office hours").with_recurring(true);
        let event = CalendarEvent::from_record(&record);
        assert!(!event.visible);
        assert_eq!(event.description, None);
        assert_eq!(event.format, None);
    }

    #[test]
    fn grade_types() {
        assert_eq!(
            GradeType::from_setting(100),
            GradeType::Value {
                grade_max: 100,
                grade_min: 0
            }
        );
        assert_eq!(GradeType::from_setting(-3), GradeType::Scale { scale_id: 3 });
        assert_eq!(GradeType::from_setting(0), GradeType::None);
    }

    #[test]
    fn grade_item_strips_markup() {
        let record = MeetingRecord::new(4, "<b>Lab</b> session").with_grade(-7);
        let item = GradeItem::from_record(&record);
        assert_eq!(item.item_name, "Lab session");
        assert_eq!(item.grade_type, GradeType::Scale { scale_id: 7 });
    }

    #[test]
    fn gradebook_requires_item_for_grades() {
        let book = MemoryGradeBook::new();
        assert!(book.set_grade(1, 2, 3, 10).is_err());

        let mut record = MeetingRecord::new(1, "x").with_grade(10);
        record.id = 2;
        book.upsert_item(&GradeItem::from_record(&record)).unwrap();
        book.set_grade(1, 2, 3, 10).unwrap();
        assert_eq!(book.grade(1, 2, 3), Some(10));

        book.delete_item(1, 2).unwrap();
        assert_eq!(book.grade(1, 2, 3), None);
    }

    #[test]
    fn user_directory_ignores_case() {
        let users = MemoryUserDirectory::new([("Ada@Example.com", 5)]);
        assert_eq!(users.find_by_email(" ada@example.COM"), Some(5));
        assert_eq!(users.find_by_email("grace@example.com"), None);
    }
}
