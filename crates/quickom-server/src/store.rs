//! Local persistence for meeting records and recorded sessions.
//!
//! [`LocalStore`] keeps everything in memory and, when opened on a path,
//! rewrites a JSON file after every mutation. Writes stamp
//! `time_modified`; [`MeetingStore::update_if_unchanged`] uses it as an
//! optimistic concurrency token.
//!
//! The store doubles as a [`GradeBook`]: grade items follow the stored
//! records and awarded grades are kept alongside them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use quickom_core::MeetingRecord;
use quickom_core::time::now_epoch;

use crate::collaborators::{GradeBook, GradeItem};
use crate::error::{CollaboratorError, StoreError, StoreResult};
use crate::session::{Participant, SessionDetails};

/// Meeting record persistence.
pub trait MeetingStore: Send + Sync {
    /// Every stored record.
    fn all(&self) -> StoreResult<Vec<MeetingRecord>>;

    /// Records still believed to exist on the provider.
    fn existing(&self) -> StoreResult<Vec<MeetingRecord>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.exists_on_provider)
            .collect())
    }

    /// Looks up one record.
    fn get(&self, id: i64) -> StoreResult<Option<MeetingRecord>>;

    /// Stores a new record and assigns its id.
    fn insert(&self, record: MeetingRecord) -> StoreResult<MeetingRecord>;

    /// Overwrites a stored record.
    fn update(&self, record: MeetingRecord) -> StoreResult<MeetingRecord>;

    /// Overwrites a stored record only if its `time_modified` still equals
    /// `expected_modified`.
    fn update_if_unchanged(
        &self,
        record: MeetingRecord,
        expected_modified: i64,
    ) -> StoreResult<MeetingRecord>;

    /// Removes a record. Returns false if it did not exist.
    fn delete(&self, id: i64) -> StoreResult<bool>;
}

/// Session and participant persistence.
pub trait SessionStore: Send + Sync {
    /// Stores a session and assigns its id.
    fn insert_session(&self, session: SessionDetails) -> StoreResult<SessionDetails>;

    /// Stores a participant row and assigns its id.
    fn insert_participant(&self, participant: Participant) -> StoreResult<Participant>;

    /// Every stored session.
    fn sessions(&self) -> StoreResult<Vec<SessionDetails>>;

    /// Every stored participant row.
    fn participants(&self) -> StoreResult<Vec<Participant>>;

    /// Removes participant rows matching `filter`. Returns how many.
    fn delete_participants(&self, filter: &dyn Fn(&Participant) -> bool) -> StoreResult<usize>;

    /// Removes the sessions of an instance and their participants.
    fn delete_sessions_for(&self, instance_id: i64) -> StoreResult<usize>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreData {
    last_meeting_id: i64,
    last_session_id: i64,
    last_participant_id: i64,
    meetings: BTreeMap<i64, MeetingRecord>,
    sessions: BTreeMap<i64, SessionDetails>,
    participants: BTreeMap<i64, Participant>,
    grades: Vec<StoredGrade>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredGrade {
    course_id: i64,
    instance: i64,
    user_id: i64,
    grade: i64,
}

/// Next `time_modified` value, strictly after `previous`.
fn stamp(previous: i64) -> i64 {
    now_epoch().max(previous + 1)
}

/// In-memory store with optional JSON file persistence.
#[derive(Debug)]
pub struct LocalStore {
    data: Mutex<StoreData>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Creates an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            path: None,
        }
    }

    /// Opens the store file at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            StoreData::default()
        };
        debug!(path = %path.display(), meetings = data.meetings.len(), "opened store");
        Ok(Self {
            data: Mutex::new(data),
            path: Some(path),
        })
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Grade awarded to one user, if any.
    pub fn grade(&self, course_id: i64, instance: i64, user_id: i64) -> Option<i64> {
        self.read(|d| {
            d.grades
                .iter()
                .find(|g| g.course_id == course_id && g.instance == instance && g.user_id == user_id)
                .map(|g| g.grade)
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        f(&self.lock())
    }

    /// Applies `f` and persists the result if it succeeded.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> StoreResult<T>) -> StoreResult<T> {
        let mut data = self.lock();
        let out = f(&mut data)?;
        if let Some(ref path) = self.path {
            save(path, &data)?;
        }
        Ok(out)
    }
}

fn save(path: &Path, data: &StoreData) -> StoreResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
    fs::rename(&tmp, path)?;
    trace!(path = %path.display(), "store saved");
    Ok(())
}

impl MeetingStore for LocalStore {
    fn all(&self) -> StoreResult<Vec<MeetingRecord>> {
        Ok(self.read(|d| d.meetings.values().cloned().collect()))
    }

    fn get(&self, id: i64) -> StoreResult<Option<MeetingRecord>> {
        Ok(self.read(|d| d.meetings.get(&id).cloned()))
    }

    fn insert(&self, mut record: MeetingRecord) -> StoreResult<MeetingRecord> {
        self.mutate(|d| {
            d.last_meeting_id += 1;
            record.id = d.last_meeting_id;
            record.time_modified = stamp(0);
            d.meetings.insert(record.id, record.clone());
            Ok(record)
        })
    }

    fn update(&self, mut record: MeetingRecord) -> StoreResult<MeetingRecord> {
        self.mutate(|d| {
            let stored = d
                .meetings
                .get_mut(&record.id)
                .ok_or(StoreError::NotFound { id: record.id })?;
            record.time_modified = stamp(stored.time_modified);
            *stored = record.clone();
            Ok(record)
        })
    }

    fn update_if_unchanged(
        &self,
        mut record: MeetingRecord,
        expected_modified: i64,
    ) -> StoreResult<MeetingRecord> {
        self.mutate(|d| {
            let stored = d
                .meetings
                .get_mut(&record.id)
                .ok_or(StoreError::NotFound { id: record.id })?;
            if stored.time_modified != expected_modified {
                return Err(StoreError::Conflict {
                    id: record.id,
                    expected: expected_modified,
                    found: stored.time_modified,
                });
            }
            record.time_modified = stamp(stored.time_modified);
            *stored = record.clone();
            Ok(record)
        })
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        self.mutate(|d| Ok(d.meetings.remove(&id).is_some()))
    }
}

impl SessionStore for LocalStore {
    fn insert_session(&self, mut session: SessionDetails) -> StoreResult<SessionDetails> {
        self.mutate(|d| {
            d.last_session_id += 1;
            session.id = d.last_session_id;
            d.sessions.insert(session.id, session.clone());
            Ok(session)
        })
    }

    fn insert_participant(&self, mut participant: Participant) -> StoreResult<Participant> {
        self.mutate(|d| {
            d.last_participant_id += 1;
            participant.id = d.last_participant_id;
            d.participants.insert(participant.id, participant.clone());
            Ok(participant)
        })
    }

    fn sessions(&self) -> StoreResult<Vec<SessionDetails>> {
        Ok(self.read(|d| d.sessions.values().cloned().collect()))
    }

    fn participants(&self) -> StoreResult<Vec<Participant>> {
        Ok(self.read(|d| d.participants.values().cloned().collect()))
    }

    fn delete_participants(&self, filter: &dyn Fn(&Participant) -> bool) -> StoreResult<usize> {
        self.mutate(|d| {
            let before = d.participants.len();
            d.participants.retain(|_, p| !filter(p));
            Ok(before - d.participants.len())
        })
    }

    fn delete_sessions_for(&self, instance_id: i64) -> StoreResult<usize> {
        self.mutate(|d| {
            let doomed: Vec<i64> = d
                .sessions
                .values()
                .filter(|s| s.instance_id == instance_id)
                .map(|s| s.id)
                .collect();
            d.participants.retain(|_, p| !doomed.contains(&p.details_id));
            d.sessions.retain(|id, _| !doomed.contains(id));
            Ok(doomed.len())
        })
    }
}

impl GradeBook for LocalStore {
    fn upsert_item(&self, item: &GradeItem) -> Result<(), CollaboratorError> {
        // Items are derived from the stored record.
        let known = self.read(|d| {
            d.meetings
                .get(&item.instance)
                .is_some_and(|r| r.course == item.course_id)
        });
        if !known {
            return Err(CollaboratorError(format!(
                "no stored instance {} in course {}",
                item.instance, item.course_id
            )));
        }
        Ok(())
    }

    fn delete_item(&self, course_id: i64, instance: i64) -> Result<(), CollaboratorError> {
        self.mutate(|d| {
            d.grades
                .retain(|g| !(g.course_id == course_id && g.instance == instance));
            Ok(())
        })
        .map_err(|e| CollaboratorError(e.to_string()))
    }

    fn set_grade(
        &self,
        course_id: i64,
        instance: i64,
        user_id: i64,
        grade: i64,
    ) -> Result<(), CollaboratorError> {
        self.mutate(|d| {
            let graded = d
                .meetings
                .get(&instance)
                .is_some_and(|r| r.course == course_id && r.grade != 0);
            if !graded {
                return Err(StoreError::NotFound { id: instance });
            }
            d.grades.retain(|g| {
                !(g.course_id == course_id && g.instance == instance && g.user_id == user_id)
            });
            d.grades.push(StoredGrade {
                course_id,
                instance,
                user_id,
                grade,
            });
            Ok(())
        })
        .map_err(|e| CollaboratorError(format!("no grade item for instance {}: {}", instance, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str) -> MeetingRecord {
        MeetingRecord::new(5, name).with_schedule(1_700_000_000, 3600)
    }

    #[test]
    fn insert_assigns_ids_and_stamps() {
        let store = LocalStore::in_memory();
        let a = store.insert(record("A")).unwrap();
        let b = store.insert(record("B")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.time_modified > 0);
        assert_eq!(store.get(2).unwrap().unwrap().name, "B");
        assert_eq!(store.get(3).unwrap(), None);
    }

    #[test]
    fn update_advances_time_modified() {
        let store = LocalStore::in_memory();
        let saved = store.insert(record("A")).unwrap();
        let mut edited = saved.clone();
        edited.name = "A2".into();
        let updated = store.update(edited).unwrap();
        assert!(updated.time_modified > saved.time_modified);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let store = LocalStore::in_memory();
        let mut r = record("x");
        r.id = 99;
        assert!(matches!(store.update(r), Err(StoreError::NotFound { id: 99 })));
    }

    #[test]
    fn update_if_unchanged_detects_conflict() {
        let store = LocalStore::in_memory();
        let read = store.insert(record("A")).unwrap();

        // Someone else writes in between.
        let mut user_edit = read.clone();
        user_edit.name = "Edited by instructor".into();
        store.update(user_edit).unwrap();

        let mut sync_edit = read.clone();
        sync_edit.duration = 5400;
        let err = store
            .update_if_unchanged(sync_edit, read.time_modified)
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(read.id).unwrap().unwrap().name, "Edited by instructor");
    }

    #[test]
    fn update_if_unchanged_writes_when_current() {
        let store = LocalStore::in_memory();
        let read = store.insert(record("A")).unwrap();
        let mut edit = read.clone();
        edit.duration = 5400;
        let saved = store.update_if_unchanged(edit, read.time_modified).unwrap();
        assert_eq!(saved.duration, 5400);
        assert!(saved.time_modified > read.time_modified);
    }

    #[test]
    fn existing_filters_missing() {
        let store = LocalStore::in_memory();
        store.insert(record("A")).unwrap();
        let mut gone = record("B");
        gone.exists_on_provider = false;
        store.insert(gone).unwrap();

        let existing = store.existing().unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].name, "A");
        assert_eq!(store.all().unwrap().len(), 2);
    }

    #[test]
    fn file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = LocalStore::open(&path).unwrap();
            store.insert(record("Persisted")).unwrap();
            store
                .insert_session(SessionDetails {
                    instance_id: 1,
                    topic: "Persisted".into(),
                    ..Default::default()
                })
                .unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get(1).unwrap().unwrap().name, "Persisted");
        assert_eq!(reopened.sessions().unwrap().len(), 1);

        let next = reopened.insert(record("Second")).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LocalStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn deleting_sessions_cascades_to_participants() {
        let store = LocalStore::in_memory();
        let s1 = store
            .insert_session(SessionDetails {
                instance_id: 1,
                ..Default::default()
            })
            .unwrap();
        let s2 = store
            .insert_session(SessionDetails {
                instance_id: 2,
                ..Default::default()
            })
            .unwrap();
        for details_id in [s1.id, s1.id, s2.id] {
            store
                .insert_participant(Participant {
                    details_id,
                    ..Default::default()
                })
                .unwrap();
        }

        assert_eq!(store.delete_sessions_for(1).unwrap(), 1);
        let left = store.participants().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].details_id, s2.id);
    }

    #[test]
    fn awarded_grades_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let stored = {
            let store = LocalStore::open(&path).unwrap();
            let stored = store.insert(record("Graded").with_grade(10)).unwrap();
            store.upsert_item(&GradeItem::from_record(&stored)).unwrap();
            store.set_grade(5, stored.id, 21, 10).unwrap();
            stored
        };

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.grade(5, stored.id, 21), Some(10));
        assert_eq!(reopened.grade(5, stored.id, 22), None);

        reopened.delete_item(5, stored.id).unwrap();
        assert_eq!(LocalStore::open(&path).unwrap().grade(5, stored.id, 21), None);
    }

    #[test]
    fn grades_need_a_graded_instance() {
        let store = LocalStore::in_memory();
        let ungraded = store.insert(record("Plain")).unwrap();
        assert!(store.set_grade(5, ungraded.id, 21, 10).is_err());
        assert!(store.set_grade(5, 99, 21, 10).is_err());

        let mut elsewhere = GradeItem::from_record(&ungraded);
        elsewhere.course_id = 6;
        assert!(store.upsert_item(&elsewhere).is_err());
    }
}
