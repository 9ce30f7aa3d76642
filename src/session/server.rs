use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message;

use crate::error::{Result, SessionError};

use super::protocol::ServerMessage;
use super::store::{Admission, GroupSnapshot, GroupStore, StudentRecord};

/// Owns the class session and the connection registry. Every operation that
/// changes group membership fans the full snapshot out to all connected
/// clients; errors stay with the originator.
pub struct SessionServer {
    store: Arc<GroupStore>,
    connections: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>>,
}

impl SessionServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: GroupStore::new(),
            connections: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Generate an opaque connection ID for a freshly upgraded socket
    pub fn generate_connection_id() -> String {
        let mut rng = rand::thread_rng();
        format!("{:016x}", rng.gen::<u64>())
    }

    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    pub async fn register_connection(
        &self,
        connection_id: &str,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id.to_string(), sender);
        tracing::info!(connection_id = %connection_id, "Client connected");
    }

    pub async fn unregister_connection(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id);
        tracing::info!(connection_id = %connection_id, "Client disconnected");
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// Admit a student under the given code. The originator hears
    /// LoginSuccess and its StudentInfo first; a first-time admit then
    /// broadcasts the new snapshot, while a re-login only repaints the
    /// originator (membership did not change).
    pub async fn login(
        &self,
        connection_id: &str,
        student_id: &str,
        class_code: &str,
    ) -> Result<Admission> {
        let (admission, snapshot) = self
            .store
            .admit_student(student_id, class_code, connection_id.to_string())
            .await?;

        self.send_to(connection_id, &ServerMessage::LoginSuccess).await;
        self.send_to(connection_id, &ServerMessage::student_info(admission.record()))
            .await;

        match &admission {
            Admission::Assigned(_) => {
                self.broadcast(&ServerMessage::update_groups(snapshot)).await;
            }
            Admission::Rejoined(_) => {
                self.send_to(connection_id, &ServerMessage::update_groups(snapshot))
                    .await;
            }
        }

        Ok(admission)
    }

    /// Explicit logout always vacates the seat. Returns None if the sender
    /// was not a registered student.
    pub async fn logout(&self, connection_id: &str) -> Option<StudentRecord> {
        let student_id = self.store.student_for_connection(connection_id).await?;
        let (record, snapshot) = self.store.remove_student(&student_id).await?;

        tracing::info!(student_id = %record.student_id, "Student logged out");
        self.broadcast(&ServerMessage::update_groups(snapshot)).await;
        Some(record)
    }

    pub async fn shuffle(&self) {
        let snapshot = self.store.shuffle_all().await;
        self.broadcast(&ServerMessage::update_groups(snapshot)).await;
    }

    pub async fn move_student(
        &self,
        source_group: usize,
        source_index: usize,
        dest_group: usize,
        dest_index: usize,
    ) -> Result<StudentRecord> {
        let (record, snapshot) = self
            .store
            .move_student(source_group, source_index, dest_group, dest_index)
            .await?;

        self.broadcast(&ServerMessage::update_groups(snapshot)).await;
        Ok(record)
    }

    pub async fn end_session(&self) {
        self.store.end_session().await;
        self.broadcast(&ServerMessage::SessionEnded).await;
    }

    /// Issue a fresh class code, resetting the session. Clients still showing
    /// the previous session repaint from the now-empty snapshot.
    pub async fn issue_class_code(&self) -> String {
        let (code, snapshot) = self.store.issue_class_code().await;
        self.broadcast(&ServerMessage::update_groups(snapshot)).await;
        code
    }

    /// Socket dropped without a logout: unregister the connection and clear
    /// the student's handle. Membership is unchanged, so nothing is broadcast.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        self.unregister_connection(connection_id).await;
        self.store.mark_disconnected(connection_id).await;
    }

    pub async fn snapshot(&self) -> GroupSnapshot {
        self.store.snapshot().await
    }

    pub async fn send_to(&self, connection_id: &str, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server message");
                return;
            }
        };

        let connections = self.connections.read().await;
        match connections.get(connection_id) {
            Some(sender) => {
                if sender.send(Message::text(text)).is_err() {
                    tracing::warn!(
                        connection_id = %connection_id,
                        "Dropping message for closed connection"
                    );
                }
            }
            None => {
                tracing::warn!(
                    connection_id = %connection_id,
                    "No such connection to send to"
                );
            }
        }
    }

    pub async fn broadcast(&self, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast");
                return;
            }
        };

        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            if sender.send(Message::text(text.clone())).is_err() {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Dropping broadcast for closed connection"
                );
            }
        }
    }
}
