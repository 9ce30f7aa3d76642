// Grouper Server CLI Validation Tool
// This tool exercises the session protocol and admin endpoints through automated scenarios and interactive commands

use clap::{Parser, Subcommand};
use colored::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::io::{self, Write};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

#[derive(Parser)]
#[command(name = "grouper-cli")]
#[command(about = "Grouper Server CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:5000)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Fetch the current class snapshot
    ClassData,

    /// Test WebSocket connection
    Connect,

    /// Generate a new class code (admin)
    GenerateCode {
        /// Admin email
        #[arg(short, long)]
        email: String,

        /// Admin password
        #[arg(short, long)]
        password: String,
    },

    /// Log in as a student
    Login {
        /// Student ID
        #[arg(short = 'i', long)]
        student_id: String,

        /// Active class code
        #[arg(short, long)]
        class_code: String,

        /// Keep connection alive and print broadcasts (press Ctrl+C to exit)
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Shuffle all students into new groups (admin)
    Shuffle,

    /// Move a student between groups (admin)
    Move {
        #[arg(long)]
        source_group: usize,

        #[arg(long)]
        source_index: usize,

        #[arg(long)]
        dest_group: usize,

        #[arg(long)]
        dest_index: usize,
    },

    /// End the current session (admin)
    EndSession,

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Admin email for scenarios that issue a class code (falls back to ADMIN_EMAIL)
        #[arg(long)]
        email: Option<String>,

        /// Admin password for scenarios that issue a class code (falls back to ADMIN_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },

    /// Interactive mode - send custom messages
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::ClassData => {
            fetch_class_data(&cli.server).await;
        }
        Commands::Connect => {
            test_connection(&cli.server).await;
        }
        Commands::GenerateCode { email, password } => {
            generate_code(&cli.server, email, password).await;
        }
        Commands::Login {
            student_id,
            class_code,
            keep_alive,
        } => {
            student_login(&cli.server, student_id, class_code, *keep_alive).await;
        }
        Commands::Shuffle => {
            send_admin_event(&cli.server, json!({"type": "AdminShuffle"}), "AdminShuffle").await;
        }
        Commands::Move {
            source_group,
            source_index,
            dest_group,
            dest_index,
        } => {
            let msg = json!({
                "type": "AdminMoveStudent",
                "source_group": source_group,
                "source_index": source_index,
                "dest_group": dest_group,
                "dest_index": dest_index,
            });
            send_admin_event(&cli.server, msg, "AdminMoveStudent").await;
        }
        Commands::EndSession => {
            send_admin_event(&cli.server, json!({"type": "AdminEndSession"}), "AdminEndSession")
                .await;
        }
        Commands::Validate {
            all,
            scenario,
            email,
            password,
        } => {
            let creds = admin_creds(email.clone(), password.clone());
            if *all {
                run_all_validations(&cli.server, creds.as_ref()).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, creds.as_ref(), s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive => {
            interactive_mode(&cli.server).await;
        }
    }
}

fn admin_creds(email: Option<String>, password: Option<String>) -> Option<(String, String)> {
    let email = email.or_else(|| std::env::var("ADMIN_EMAIL").ok())?;
    let password = password.or_else(|| std::env::var("ADMIN_PASSWORD").ok())?;
    Some((email, password))
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn fetch_class_data(server: &str) {
    println!("{}", "Fetching class snapshot...".cyan());

    let url = format!("http://{}/admin/get-class-data", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    match body["class_code"].as_str() {
                        Some(code) => println!("{} Active class code: {}", "✓".green(), code.bold()),
                        None => println!("{} No active session", "○".yellow()),
                    }

                    if let Some(groups) = body["groups"].as_object() {
                        let seated: usize =
                            groups.values().filter_map(|g| g.as_array()).map(|g| g.len()).sum();
                        println!("  Students seated: {}", seated);
                        for (number, members) in groups {
                            if let Some(members) = members.as_array() {
                                if members.is_empty() {
                                    continue;
                                }
                                let names: Vec<&str> = members
                                    .iter()
                                    .filter_map(|m| m["student_id"].as_str())
                                    .collect();
                                println!("  Group {}: {}", number.cyan(), names.join(", "));
                            }
                        }
                    }
                }
            } else {
                println!("{} Snapshot fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn test_connection(server: &str) {
    println!("{}", "Testing WebSocket connection...".cyan());

    let url = format!("ws://{}/session", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection established", "✓".green());
            println!("  URL: {}", url);
            drop(ws_stream);
            println!("{} Connection closed cleanly", "✓".green());
        }
        Err(e) => {
            println!("{} WebSocket connection failed: {}", "✗".red(), e);
        }
    }
}

async fn generate_code(server: &str, email: &str, password: &str) {
    println!("{}", "Requesting new class code...".cyan());

    let url = format!("http://{}/admin/generate-code", server);
    let client = reqwest::Client::new();

    match client
        .post(&url)
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
    {
        Ok(resp) => {
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    let code = body["class_code"].as_str().unwrap_or("unknown");
                    println!("{} Class code issued!", "✓".green());
                    println!("\n{}", "═".repeat(50).green());
                    println!("{} {}", "Class code:".bold(), code.green().bold());
                    println!("{}", "═".repeat(50).green());
                }
            } else if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                println!("{} Invalid admin credentials", "✗".red());
            } else {
                println!("{} Request failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn student_login(server: &str, student_id: &str, class_code: &str, keep_alive: bool) {
    println!("{}", "Logging in...".cyan());
    println!("  Student ID: {}", student_id);
    println!("  Class code: {}", class_code);

    let url = format!("ws://{}/session", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    let msg = json!({
        "type": "Login",
        "student_id": student_id,
        "class_code": class_code,
    });

    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send Login message", "✗".red());
        return;
    }

    println!("{} Login message sent", "✓".green());

    match next_server_message(&mut read, 5).await {
        Some(response) if response["type"] == "LoginSuccess" => {
            println!("{} Login accepted", "✓".green());
        }
        Some(response) if response["type"] == "LoginError" => {
            println!("{} Login rejected: {}", "✗".red(), response["message"]);
            return;
        }
        Some(response) => {
            println!("{} Unexpected response: {}", "✗".yellow(), response["type"]);
            return;
        }
        None => {
            println!("{} No response from server", "✗".red());
            return;
        }
    }

    if let Some(info) = next_server_message(&mut read, 5).await {
        if info["type"] == "StudentInfo" {
            println!("\n{}", "═".repeat(50).green());
            println!("{} {}", "Name:".bold(), info["name"].as_str().unwrap_or("?"));
            println!(
                "{} {}",
                "Group:".bold(),
                info["group_number"].to_string().green().bold()
            );
            println!("{}", "═".repeat(50).green());
        }
    }

    if keep_alive {
        println!("\n{}", "Listening for group updates...".yellow());
        println!("Press {} to log out and disconnect.", "Ctrl+C".bold());

        loop {
            match timeout(Duration::from_secs(30), read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    println!("{} {}", "◀".green(), text.bright_white());
                }
                Ok(Some(Ok(Message::Close(_)))) => {
                    println!("{} Server closed the connection", "✗".yellow());
                    break;
                }
                Ok(Some(Ok(_))) => {
                    // Ignore other message types (Binary, Ping, Pong, Frame)
                    continue;
                }
                Ok(Some(Err(e))) => {
                    println!("{} Connection error: {}", "✗".red(), e);
                    break;
                }
                Ok(None) => {
                    println!("{} Connection closed", "✗".yellow());
                    break;
                }
                Err(_) => {
                    // Timeout - just continue listening
                    continue;
                }
            }
        }
    } else {
        println!("\n{}", "⚠ Note: Connection closed. The seat is retained for re-login.".yellow());
        println!("Use {} to stay connected.", "--keep-alive".cyan());
    }
}

async fn send_admin_event(server: &str, msg: serde_json::Value, label: &str) {
    println!("{}", format!("Sending {}...", label).cyan());

    let url = format!("ws://{}/session", server);

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send {} message", "✗".red(), label);
        return;
    }

    println!("{} {} message sent", "✓".green(), label);

    match next_server_message(&mut read, 5).await {
        Some(response) => match response["type"].as_str() {
            Some("UpdateGroups") => {
                println!("{} Groups updated", "✓".green());
            }
            Some("SessionEnded") => {
                println!("{} Session ended", "✓".green());
            }
            Some("MoveError") => {
                println!("{} Move rejected: {}", "✗".red(), response["message"]);
            }
            _ => {
                println!("Response: {}", response);
            }
        },
        None => {
            println!("{} No response received", "○".yellow());
        }
    }
}

/// Wait for the next text frame and parse it, skipping pings
async fn next_server_message(read: &mut WsRead, secs: u64) -> Option<serde_json::Value> {
    loop {
        match timeout(Duration::from_secs(secs), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return serde_json::from_str(&text).ok();
            }
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Err(_) => return None,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => return None,
        }
    }
}

async fn open_session(server: &str) -> Option<(WsWrite, WsRead)> {
    let url = format!("ws://{}/session", server);
    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            let (write, read) = ws_stream.split();
            Some((write, read))
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            None
        }
    }
}

async fn issue_code(server: &str, creds: &(String, String)) -> Option<String> {
    let url = format!("http://{}/admin/generate-code", server);
    let client = reqwest::Client::new();

    let resp = client
        .post(&url)
        .json(&json!({"email": creds.0, "password": creds.1}))
        .send()
        .await
        .ok()?;

    if !resp.status().is_success() {
        println!("{} generate-code returned {}", "✗".red(), resp.status());
        return None;
    }

    let body = resp.json::<serde_json::Value>().await.ok()?;
    body["class_code"].as_str().map(|s| s.to_string())
}

async fn login_and_expect_success(
    write: &mut WsWrite,
    read: &mut WsRead,
    student_id: &str,
    class_code: &str,
) -> bool {
    let msg = json!({
        "type": "Login",
        "student_id": student_id,
        "class_code": class_code,
    });

    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send Login", "✗".red());
        return false;
    }

    match next_server_message(read, 3).await {
        Some(response) if response["type"] == "LoginSuccess" => true,
        Some(response) => {
            println!("{} Expected LoginSuccess, got {}", "✗".red(), response["type"]);
            false
        }
        None => {
            println!("{} No response to Login", "✗".red());
            false
        }
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("\n{}", "Server:".bold().cyan());
    println!("  {} - Basic WebSocket connection test", "connection".cyan());
    println!("  {} - Health endpoint check", "health".cyan());
    println!("\n{}", "Admin HTTP:".bold().cyan());
    println!("  {} - Issue a fresh class code (needs credentials)", "generate-code".cyan());
    println!("\n{}", "Session Flow:".bold().cyan());
    println!("  {} - Full student login flow", "login-flow".cyan());
    println!("  {} - Login with a bogus class code", "invalid-code".cyan());
    println!("  {} - Re-login keeps the same seat", "relogin".cyan());
    println!("  {} - Shuffle broadcast reaches all clients", "shuffle".cyan());
    println!("  {} - Move into a full group is rejected", "move-full".cyan());
    println!("\nScenarios that issue class codes need --email/--password");
    println!("or ADMIN_EMAIL/ADMIN_PASSWORD in the environment.");
    println!("\nExample: grouper-cli validate --scenario connection");
    println!("Example: grouper-cli validate --all --email admin@example.com --password secret");
}

async fn run_scenario(server: &str, creds: Option<&(String, String)>, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let result = match scenario {
        "connection" => validate_connection(server).await,
        "health" => validate_health(server).await,
        "generate-code" => validate_generate_code(server, creds).await,
        "login-flow" => validate_login_flow(server, creds).await,
        "invalid-code" => validate_invalid_code(server).await,
        "relogin" => validate_relogin(server, creds).await,
        "shuffle" => validate_shuffle(server, creds).await,
        "move-full" => validate_move_full(server, creds).await,
        _ => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
            return;
        }
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
}

async fn run_all_validations(server: &str, creds: Option<&(String, String)>) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let server_scenarios = vec!["connection", "health"];
    let admin_scenarios = vec!["generate-code"];
    let session_scenarios = vec![
        "login-flow",
        "invalid-code",
        "relogin",
        "shuffle",
        "move-full",
    ];

    let needs_creds = |scenario: &str| scenario != "connection" && scenario != "health" && scenario != "invalid-code";

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    let sections: Vec<(&str, Vec<&str>)> = vec![
        ("Server Tests", server_scenarios),
        ("Admin HTTP Tests", admin_scenarios),
        ("Session Flow Tests", session_scenarios),
    ];

    for (section, scenarios) in sections {
        println!("{}", section.bold().cyan());
        for scenario in scenarios {
            println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
            println!("{}", "─".repeat(60));

            if needs_creds(scenario) && creds.is_none() {
                println!("{} No admin credentials, skipping", "○".yellow());
                skipped += 1;
                continue;
            }

            let result = match scenario {
                "connection" => validate_connection(server).await,
                "health" => validate_health(server).await,
                "generate-code" => validate_generate_code(server, creds).await,
                "login-flow" => validate_login_flow(server, creds).await,
                "invalid-code" => validate_invalid_code(server).await,
                "relogin" => validate_relogin(server, creds).await,
                "shuffle" => validate_shuffle(server, creds).await,
                "move-full" => validate_move_full(server, creds).await,
                _ => false,
            };

            if result {
                passed += 1;
            } else {
                failed += 1;
            }

            sleep(Duration::from_millis(500)).await;
        }
        println!();
    }

    println!("{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    if skipped > 0 {
        println!(
            "  {} Skipped (missing credentials): {}",
            "○".yellow(),
            skipped.to_string().yellow()
        );
    }
    println!("  Total: {}", passed + failed + skipped);

    if failed == 0 {
        println!("\n{}", "All validations passed! 🎉".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn validate_connection(server: &str) -> bool {
    let url = format!("ws://{}/session", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} WebSocket connection successful", "✓".green());
            drop(ws_stream);
            true
        }
        Err(e) => {
            println!("{} Connection failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_health(server: &str) -> bool {
    let url = format!("http://{}/health", server);

    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            println!("{} Health endpoint healthy", "✓".green());
            true
        }
        Ok(resp) => {
            println!("{} Health endpoint returned {}", "✗".red(), resp.status());
            false
        }
        Err(e) => {
            println!("{} Request failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_generate_code(server: &str, creds: Option<&(String, String)>) -> bool {
    let Some(creds) = creds else {
        println!("{} No admin credentials provided", "✗".red());
        return false;
    };

    match issue_code(server, creds).await {
        Some(code) => {
            if code.len() == 4 && code.chars().all(|c| c.is_ascii_digit()) {
                println!("{} Class code issued: {}", "✓".green(), code);
                true
            } else {
                println!("{} Unexpected code format: {}", "✗".red(), code);
                false
            }
        }
        None => false,
    }
}

async fn validate_login_flow(server: &str, creds: Option<&(String, String)>) -> bool {
    let Some(creds) = creds else { return false };
    let Some(code) = issue_code(server, creds).await else {
        return false;
    };
    println!("  Step 1: Issued class code {}", code);

    let Some((mut write, mut read)) = open_session(server).await else {
        return false;
    };

    if !login_and_expect_success(&mut write, &mut read, "validator_1", &code).await {
        return false;
    }
    println!("  Step 2: LoginSuccess received");

    let Some(info) = next_server_message(&mut read, 3).await else {
        println!("{} No StudentInfo received", "✗".red());
        return false;
    };
    if info["type"] != "StudentInfo" || info["group_number"] != 1 {
        println!("{} Expected StudentInfo for group 1, got {}", "✗".red(), info);
        return false;
    }
    println!("  Step 3: Seated in group 1");

    let Some(update) = next_server_message(&mut read, 3).await else {
        println!("{} No UpdateGroups broadcast received", "✗".red());
        return false;
    };
    if update["type"] != "UpdateGroups" {
        println!("{} Expected UpdateGroups, got {}", "✗".red(), update["type"]);
        return false;
    }
    println!("{} Full login flow verified", "✓".green());
    true
}

async fn validate_invalid_code(server: &str) -> bool {
    let Some((mut write, mut read)) = open_session(server).await else {
        return false;
    };

    let msg = json!({
        "type": "Login",
        "student_id": "validator_bogus",
        "class_code": "not-a-code",
    });

    if write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send Login", "✗".red());
        return false;
    }

    match next_server_message(&mut read, 3).await {
        Some(response) if response["type"] == "LoginError" => {
            println!("{} Rejected with: {}", "✓".green(), response["message"]);
            true
        }
        Some(response) => {
            println!("{} Expected LoginError, got {}", "✗".red(), response["type"]);
            false
        }
        None => {
            println!("{} No response received", "✗".red());
            false
        }
    }
}

async fn validate_relogin(server: &str, creds: Option<&(String, String)>) -> bool {
    let Some(creds) = creds else { return false };
    let Some(code) = issue_code(server, creds).await else {
        return false;
    };

    let Some((mut write1, mut read1)) = open_session(server).await else {
        return false;
    };
    if !login_and_expect_success(&mut write1, &mut read1, "validator_re", &code).await {
        return false;
    }
    let Some(first_info) = next_server_message(&mut read1, 3).await else {
        return false;
    };
    println!("  First login seated in group {}", first_info["group_number"]);

    // Second connection, same student ID: must resume the same seat
    let Some((mut write2, mut read2)) = open_session(server).await else {
        return false;
    };
    if !login_and_expect_success(&mut write2, &mut read2, "validator_re", &code).await {
        return false;
    }
    let Some(second_info) = next_server_message(&mut read2, 3).await else {
        return false;
    };

    if first_info["group_number"] == second_info["group_number"] {
        println!("{} Re-login kept group {}", "✓".green(), second_info["group_number"]);
        true
    } else {
        println!(
            "{} Seat moved from group {} to {}",
            "✗".red(),
            first_info["group_number"],
            second_info["group_number"]
        );
        false
    }
}

async fn validate_shuffle(server: &str, creds: Option<&(String, String)>) -> bool {
    let Some(creds) = creds else { return false };
    let Some(code) = issue_code(server, creds).await else {
        return false;
    };

    // Seat a few students, each on its own connection held open
    let mut students = Vec::new();
    for i in 1..=3 {
        let Some((mut write, mut read)) = open_session(server).await else {
            return false;
        };
        let student_id = format!("validator_shuffle_{}", i);
        if !login_and_expect_success(&mut write, &mut read, &student_id, &code).await {
            return false;
        }
        students.push((write, read));
    }
    println!("  Seated 3 students");

    let Some((mut admin_write, mut admin_read)) = open_session(server).await else {
        return false;
    };
    if admin_write
        .send(Message::Text(json!({"type": "AdminShuffle"}).to_string()))
        .await
        .is_err()
    {
        println!("{} Failed to send AdminShuffle", "✗".red());
        return false;
    }

    match next_server_message(&mut admin_read, 3).await {
        Some(update) if update["type"] == "UpdateGroups" => {
            let seated: usize = update["groups"]
                .as_object()
                .map(|groups| {
                    groups
                        .values()
                        .filter_map(|g| g.as_array())
                        .map(|g| g.len())
                        .sum()
                })
                .unwrap_or(0);
            if seated == 3 {
                println!("{} Shuffle preserved all 3 students", "✓".green());
                true
            } else {
                println!("{} Shuffle changed the student count to {}", "✗".red(), seated);
                false
            }
        }
        Some(update) => {
            println!("{} Expected UpdateGroups, got {}", "✗".red(), update["type"]);
            false
        }
        None => {
            println!("{} No broadcast received", "✗".red());
            false
        }
    }
}

async fn validate_move_full(server: &str, creds: Option<&(String, String)>) -> bool {
    let Some(creds) = creds else { return false };
    let Some(code) = issue_code(server, creds).await else {
        return false;
    };

    // Five students: group 1 fills, the fifth lands in group 2
    let mut students = Vec::new();
    for i in 1..=5 {
        let Some((mut write, mut read)) = open_session(server).await else {
            return false;
        };
        let student_id = format!("validator_move_{}", i);
        if !login_and_expect_success(&mut write, &mut read, &student_id, &code).await {
            return false;
        }
        students.push((write, read));
    }
    println!("  Seated 5 students (group 1 full)");

    let Some((mut admin_write, mut admin_read)) = open_session(server).await else {
        return false;
    };
    let msg = json!({
        "type": "AdminMoveStudent",
        "source_group": 2,
        "source_index": 0,
        "dest_group": 1,
        "dest_index": 0,
    });
    if admin_write.send(Message::Text(msg.to_string())).await.is_err() {
        println!("{} Failed to send AdminMoveStudent", "✗".red());
        return false;
    }

    match next_server_message(&mut admin_read, 3).await {
        Some(response) if response["type"] == "MoveError" => {
            println!("{} Move rejected with: {}", "✓".green(), response["message"]);
            true
        }
        Some(response) => {
            println!("{} Expected MoveError, got {}", "✗".red(), response["type"]);
            false
        }
        None => {
            println!("{} No response received", "✗".red());
            false
        }
    }
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let url = format!("ws://{}/session", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} Connected to server", "✓".green());

            let (mut write, mut read) = ws_stream.split();

            // Spawn task to receive messages
            let receive_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        println!("\n{} {}", "◀".green(), text.bright_white());
                    }
                }
            });

            // Main input loop
            loop {
                print!("{} ", "►".cyan());
                io::stdout().flush().unwrap();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_err() {
                    break;
                }

                let input = input.trim();

                if input.is_empty() {
                    continue;
                }

                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                if input == "help" {
                    print_interactive_help();
                    continue;
                }

                // Try to parse as JSON and send
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
                    if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                        println!("{} Message sent", "✓".green());
                    } else {
                        println!("{} Failed to send message", "✗".red());
                        break;
                    }
                } else {
                    println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
                }
            }

            receive_task.abort();
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON messages directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Login".cyan());
    println!(r#"  {{"type":"Login","student_id":"12345","class_code":"1000"}}"#);

    println!("\n{}:", "Logout".cyan());
    println!(r#"  {{"type":"Logout"}}"#);

    println!("\n{}:", "Shuffle".cyan());
    println!(r#"  {{"type":"AdminShuffle"}}"#);

    println!("\n{}:", "Move Student".cyan());
    println!(
        r#"  {{"type":"AdminMoveStudent","source_group":1,"source_index":0,"dest_group":2,"dest_index":0}}"#
    );

    println!("\n{}:", "End Session".cyan());
    println!(r#"  {{"type":"AdminEndSession"}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
