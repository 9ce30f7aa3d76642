use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SessionError};

/// Number of groups per class session
pub const GROUP_COUNT: usize = 14;

/// Maximum students per group
pub const GROUP_CAPACITY: usize = 4;

/// Opaque handle to a student's live WebSocket connection
pub type ConnectionId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub group_number: usize,
    /// None once the connection has dropped; the seat stays occupied
    #[serde(skip)]
    pub connection_id: Option<ConnectionId>,
}

/// Full `{class_code, groups}` state pushed to clients on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub class_code: Option<String>,
    pub groups: BTreeMap<usize, Vec<StudentRecord>>,
}

/// Outcome of a successful login
#[derive(Debug, Clone)]
pub enum Admission {
    /// First-time assignment to a group
    Assigned(StudentRecord),
    /// Re-login with an already-seated student ID; only the connection handle changed
    Rejoined(StudentRecord),
}

impl Admission {
    pub fn record(&self) -> &StudentRecord {
        match self {
            Admission::Assigned(record) | Admission::Rejoined(record) => record,
        }
    }
}

#[derive(Debug)]
struct ClassSession {
    class_code: Option<String>,
    /// Group i (1-based) lives at index i-1; entries are student IDs in seat order
    groups: Vec<Vec<String>>,
    students: HashMap<String, StudentRecord>,
}

impl ClassSession {
    fn new() -> Self {
        Self {
            class_code: None,
            groups: vec![Vec::new(); GROUP_COUNT],
            students: HashMap::new(),
        }
    }

    fn reset(&mut self, class_code: Option<String>) {
        self.class_code = class_code;
        for group in &mut self.groups {
            group.clear();
        }
        self.students.clear();
    }

    fn snapshot(&self) -> GroupSnapshot {
        let mut groups = BTreeMap::new();
        for (i, member_ids) in self.groups.iter().enumerate() {
            let members = member_ids
                .iter()
                .filter_map(|id| self.students.get(id))
                .cloned()
                .collect();
            groups.insert(i + 1, members);
        }
        GroupSnapshot {
            class_code: self.class_code.clone(),
            groups,
        }
    }
}

/// The in-memory class session. `groups` and `students` are two indexes over
/// the same membership fact; every operation updates both under one write lock
/// and returns the snapshot produced by that same lock hold, so broadcasts
/// never observe a half-applied operation.
pub struct GroupStore {
    session: Arc<RwLock<ClassSession>>,
}

impl GroupStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(RwLock::new(ClassSession::new())),
        })
    }

    /// Generate a random 4-digit class code
    fn generate_class_code() -> String {
        let mut rng = rand::thread_rng();
        rng.gen_range(1000..10000).to_string()
    }

    /// Issue a fresh class code, discarding all prior session state
    pub async fn issue_class_code(&self) -> (String, GroupSnapshot) {
        let code = Self::generate_class_code();
        let snapshot = self.init_session(code.clone()).await;
        (code, snapshot)
    }

    pub async fn init_session(&self, class_code: String) -> GroupSnapshot {
        let mut session = self.session.write().await;
        session.reset(Some(class_code.clone()));
        tracing::info!(class_code = %class_code, "Class session initialized");
        session.snapshot()
    }

    /// Admit a student under the active class code. Re-login with a seated
    /// student ID keeps the seat and only refreshes the connection handle;
    /// a first-time login takes the first open seat in ascending group order.
    pub async fn admit_student(
        &self,
        student_id: &str,
        class_code: &str,
        connection_id: ConnectionId,
    ) -> Result<(Admission, GroupSnapshot)> {
        let mut session = self.session.write().await;

        match &session.class_code {
            Some(active) if active == class_code => {}
            _ => return Err(SessionError::InvalidCode),
        }

        if let Some(record) = session.students.get_mut(student_id) {
            record.connection_id = Some(connection_id);
            let record = record.clone();
            tracing::info!(
                student_id = %student_id,
                group = record.group_number,
                "Student re-logged in, seat unchanged"
            );
            let snapshot = session.snapshot();
            return Ok((Admission::Rejoined(record), snapshot));
        }

        let group_number = session
            .groups
            .iter()
            .position(|group| group.len() < GROUP_CAPACITY)
            .map(|i| i + 1)
            .ok_or(SessionError::SessionFull)?;

        let record = StudentRecord {
            student_id: student_id.to_string(),
            // Placeholder until a roster lookup exists
            name: format!("Student {}", student_id),
            group_number,
            connection_id: Some(connection_id),
        };

        session.groups[group_number - 1].push(student_id.to_string());
        session.students.insert(student_id.to_string(), record.clone());

        tracing::info!(student_id = %student_id, group = group_number, "Student admitted");
        let snapshot = session.snapshot();
        Ok((Admission::Assigned(record), snapshot))
    }

    /// Delete a student from their group and the registry. No-op if the ID is
    /// not registered.
    pub async fn remove_student(&self, student_id: &str) -> Option<(StudentRecord, GroupSnapshot)> {
        let mut session = self.session.write().await;
        let record = session.students.remove(student_id)?;

        if let Some(group) = session.groups.get_mut(record.group_number - 1) {
            group.retain(|id| id != student_id);
        }

        tracing::info!(
            student_id = %student_id,
            group = record.group_number,
            "Student removed from session"
        );
        let snapshot = session.snapshot();
        Some((record, snapshot))
    }

    /// Connection dropped without an explicit logout: the seat is retained and
    /// only the connection handle is cleared, so a later re-login with the
    /// same student ID resumes the same seat.
    pub async fn mark_disconnected(&self, connection_id: &str) -> Option<String> {
        let mut session = self.session.write().await;

        let student_id = session
            .students
            .values()
            .find(|record| record.connection_id.as_deref() == Some(connection_id))
            .map(|record| record.student_id.clone())?;

        if let Some(record) = session.students.get_mut(&student_id) {
            record.connection_id = None;
        }

        tracing::info!(student_id = %student_id, "Student disconnected, seat retained");
        Some(student_id)
    }

    /// Resolve the student currently bound to a live connection
    pub async fn student_for_connection(&self, connection_id: &str) -> Option<String> {
        let session = self.session.read().await;
        session
            .students
            .values()
            .find(|record| record.connection_id.as_deref() == Some(connection_id))
            .map(|record| record.student_id.clone())
    }

    /// Uniformly permute all registered students, then redistribute them into
    /// the groups in blocks of GROUP_CAPACITY: group 1 gets the first block,
    /// group 2 the next, and so on. The registered set is preserved exactly.
    pub async fn shuffle_all(&self) -> GroupSnapshot {
        let mut session = self.session.write().await;

        let mut ids: Vec<String> = session.groups.iter().flatten().cloned().collect();
        ids.shuffle(&mut rand::thread_rng());

        for group in &mut session.groups {
            group.clear();
        }

        for (i, block) in ids.chunks(GROUP_CAPACITY).enumerate() {
            session.groups[i] = block.to_vec();
            for student_id in block {
                if let Some(record) = session.students.get_mut(student_id) {
                    record.group_number = i + 1;
                }
            }
        }

        tracing::info!(students = ids.len(), "Shuffled all groups");
        session.snapshot()
    }

    /// Move the student at `source_group[source_index]` to `dest_group`,
    /// inserting at `dest_index` and shifting later seats right. Capacity is
    /// checked before anything is removed, so a failed move leaves both groups
    /// untouched; a move within one group cannot overflow and is never
    /// rejected for fullness.
    pub async fn move_student(
        &self,
        source_group: usize,
        source_index: usize,
        dest_group: usize,
        dest_index: usize,
    ) -> Result<(StudentRecord, GroupSnapshot)> {
        let mut session = self.session.write().await;

        if source_group == 0 || source_group > GROUP_COUNT {
            return Err(SessionError::GroupNotFound(source_group));
        }
        if dest_group == 0 || dest_group > GROUP_COUNT {
            return Err(SessionError::GroupNotFound(dest_group));
        }

        if source_group != dest_group && session.groups[dest_group - 1].len() >= GROUP_CAPACITY {
            return Err(SessionError::DestinationFull);
        }

        if source_index >= session.groups[source_group - 1].len() {
            return Err(SessionError::StudentNotFound {
                group: source_group,
                index: source_index,
            });
        }

        let student_id = session.groups[source_group - 1][source_index].clone();

        let record = {
            let record = session.students.get_mut(&student_id).ok_or_else(|| {
                SessionError::internal(format!("registry missing student {}", student_id))
            })?;
            record.group_number = dest_group;
            record.clone()
        };

        session.groups[source_group - 1].remove(source_index);
        let dest = &mut session.groups[dest_group - 1];
        let insert_at = dest_index.min(dest.len());
        dest.insert(insert_at, student_id);

        tracing::info!(
            student_id = %record.student_id,
            from = source_group,
            to = dest_group,
            "Student moved"
        );
        let snapshot = session.snapshot();
        Ok((record, snapshot))
    }

    /// Clear the class code, all groups, and the registry
    pub async fn end_session(&self) {
        let mut session = self.session.write().await;
        session.reset(None);
        tracing::info!("Class session ended");
    }

    pub async fn class_code(&self) -> Option<String> {
        let session = self.session.read().await;
        session.class_code.clone()
    }

    pub async fn snapshot(&self) -> GroupSnapshot {
        let session = self.session.read().await;
        session.snapshot()
    }
}
