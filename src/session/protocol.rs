use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use warp::ws::Message;

use super::server::SessionServer;
use super::store::{GroupSnapshot, StudentRecord};

/// Messages clients send over the session WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Login {
        student_id: String,
        class_code: String,
    },

    Logout,

    AdminShuffle,

    AdminMoveStudent {
        source_group: usize,
        source_index: usize,
        dest_group: usize,
        dest_index: usize,
    },

    AdminEndSession,
}

/// Messages the server pushes to clients. Serialize-only: the server never
/// parses its own wire format, and clients read it as plain JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    LoginSuccess,

    LoginError {
        message: String,
    },

    StudentInfo {
        student_id: String,
        name: String,
        group_number: usize,
    },

    UpdateGroups {
        class_code: Option<String>,
        groups: BTreeMap<usize, Vec<StudentRecord>>,
    },

    LogoutSuccess,

    MoveError {
        message: String,
    },

    SessionEnded,
}

impl ServerMessage {
    pub fn update_groups(snapshot: GroupSnapshot) -> Self {
        ServerMessage::UpdateGroups {
            class_code: snapshot.class_code,
            groups: snapshot.groups,
        }
    }

    pub fn student_info(record: &StudentRecord) -> Self {
        ServerMessage::StudentInfo {
            student_id: record.student_id.clone(),
            name: record.name.clone(),
            group_number: record.group_number,
        }
    }
}

/// Per-connection protocol handler. Maps inbound events to store operations
/// and decides what goes back to the sender versus everyone. Admin events are
/// not authenticated on this channel; any connected client may send them.
pub struct SessionHandler {
    server: Arc<SessionServer>,
    connection_id: String,
    tx: mpsc::UnboundedSender<Message>,
}

impl SessionHandler {
    /// Register the connection with the server so it receives broadcasts,
    /// and hand back the handler that will drive it.
    pub async fn connect(server: Arc<SessionServer>, tx: mpsc::UnboundedSender<Message>) -> Self {
        let connection_id = SessionServer::generate_connection_id();
        server.register_connection(&connection_id, tx.clone()).await;
        Self {
            server,
            connection_id,
            tx,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub async fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::Login {
                student_id,
                class_code,
            } => {
                self.handle_login(&student_id, &class_code).await;
            }
            ClientMessage::Logout => {
                if self.server.logout(&self.connection_id).await.is_some() {
                    self.send(&ServerMessage::LogoutSuccess);
                }
            }
            ClientMessage::AdminShuffle => {
                self.server.shuffle().await;
            }
            ClientMessage::AdminMoveStudent {
                source_group,
                source_index,
                dest_group,
                dest_index,
            } => {
                if let Err(e) = self
                    .server
                    .move_student(source_group, source_index, dest_group, dest_index)
                    .await
                {
                    self.send(&ServerMessage::MoveError {
                        message: e.to_string(),
                    });
                }
            }
            ClientMessage::AdminEndSession => {
                self.server.end_session().await;
            }
        }
    }

    async fn handle_login(&self, student_id: &str, class_code: &str) {
        // The server answers the sender and runs the broadcast itself so the
        // outcome messages and the snapshot stay in order. Only failures are
        // reported from here.
        if let Err(e) = self
            .server
            .login(&self.connection_id, student_id, class_code)
            .await
        {
            self.send(&ServerMessage::LoginError {
                message: e.to_string(),
            });
        }
    }

    fn send(&self, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server message");
                return;
            }
        };

        if self.tx.send(Message::text(text)).is_err() {
            tracing::warn!(
                connection_id = %self.connection_id,
                "Outbound channel closed, dropping message"
            );
        }
    }

    /// Socket closed. The seat is retained per the disconnect policy; only
    /// the connection registration and handle are dropped.
    pub async fn cleanup(&self) {
        self.server.handle_disconnect(&self.connection_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_parses_documented_shape() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"Login","student_id":"12345","class_code":"1000"}"#,
        )
        .unwrap();
        assert!(matches!(
            message,
            ClientMessage::Login { student_id, class_code }
                if student_id == "12345" && class_code == "1000"
        ));
    }

    #[test]
    fn test_move_parses_documented_shape() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"AdminMoveStudent","source_group":1,"source_index":0,"dest_group":2,"dest_index":1}"#,
        )
        .unwrap();
        assert!(matches!(
            message,
            ClientMessage::AdminMoveStudent {
                source_group: 1,
                source_index: 0,
                dest_group: 2,
                dest_index: 1,
            }
        ));
    }

    #[test]
    fn test_server_messages_carry_type_tag() {
        let text = serde_json::to_string(&ServerMessage::LoginError {
            message: "Invalid class code.".to_string(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "LoginError");
        assert_eq!(value["message"], "Invalid class code.");
    }
}
