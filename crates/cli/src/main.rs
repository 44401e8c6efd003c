//! Waitroom CLI - Command-line interface for the Waitroom daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9530";

#[derive(Parser)]
#[command(name = "waitroom-cli")]
#[command(about = "Waitroom virtual waiting room CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "WAITROOM_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the waiting room
    Join {
        /// User identity
        user_id: String,

        /// Contact email stored with the entry
        #[arg(short, long)]
        email: Option<String>,

        /// Metadata as JSON string
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Leave the waiting room
    Leave {
        /// User identity
        user_id: String,
    },

    /// Show a user's position or access state
    Status {
        /// User identity
        user_id: String,
    },

    /// Check whether an access token still grants access
    Verify {
        /// Access token returned by join
        access_token: String,
    },

    /// Show queue length, capacity and the head of the queue
    Info,

    /// Remove every waiting entry and active user
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct QueuedUserRow {
    position: u64,
    #[tabled(rename = "user")]
    user_id: String,
    #[tabled(rename = "joined at")]
    joined_at: String,
    #[serde(skip_deserializing)]
    #[tabled(rename = "est. wait")]
    wait: String,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn formatted_wait(value: &Value) -> String {
    value["estimatedWaitTime"]["formatted"]
        .as_str()
        .unwrap_or("-")
        .to_string()
}

fn print_waiting(result: &Value) {
    println!("  {} {}", "Position:".bold(), result["position"]);
    if !result["totalInQueue"].is_null() {
        println!("  {} {}", "In queue:".bold(), result["totalInQueue"]);
    }
    println!("  {} {}", "Est. wait:".bold(), formatted_wait(result));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Join {
            user_id,
            email,
            metadata,
        } => {
            let metadata: Option<Value> = metadata
                .map(|m| serde_json::from_str(&m))
                .transpose()
                .context("Invalid JSON metadata")?;

            let params = json!({
                "user_id": user_id,
                "email": email,
                "metadata": metadata,
            });

            let result = call_rpc(&cli.rpc_url, "queue.join.v1", params).await?;

            if result["canAccess"].as_bool().unwrap_or(false) {
                println!("{}", "✓ Access granted".green().bold());
                println!();
                println!(
                    "  {} {}",
                    "Access token:".bold(),
                    result["accessToken"].as_str().unwrap_or("-")
                );
            } else {
                println!("{}", format!("✓ {} is waiting", user_id).yellow().bold());
                println!();
                print_waiting(&result);
            }
            if let Some(token) = result["queueToken"].as_str() {
                println!("  {} {}", "Queue token:".bold(), token);
            }
        }

        Commands::Leave { user_id } => {
            let result = call_rpc(&cli.rpc_url, "queue.leave.v1", json!({ "user_id": user_id })).await?;
            let message = result["message"].as_str().unwrap_or_default();

            if result["removed"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ {}", message).green().bold());
            } else {
                println!("{}", message.yellow());
            }
        }

        Commands::Status { user_id } => {
            match call_rpc(&cli.rpc_url, "queue.status.v1", json!({ "user_id": user_id })).await {
                Ok(result) => {
                    let status = result["status"].as_str().unwrap_or("unknown");
                    println!("{} {}", "Status:".bold(), status.cyan());
                    if status == "waiting" {
                        print_waiting(&result);
                        println!("  {} {}", "Active users:".bold(), result["activeUsers"]);
                    }
                }
                Err(e) => {
                    println!("{} {}", "Status:".bold(), "not in queue".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Verify { access_token } => {
            let result = call_rpc(
                &cli.rpc_url,
                "queue.verify.v1",
                json!({ "access_token": access_token }),
            )
            .await?;

            let user = result["userId"].as_str().unwrap_or("-");
            if result["valid"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Token valid for {}", user).green().bold());
            } else {
                println!(
                    "{}",
                    format!("✗ {} is {}", user, result["status"].as_str().unwrap_or("-")).red()
                );
            }
        }

        Commands::Info => {
            println!("{}", "Queue Info".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.info.v1", json!({})).await {
                Ok(info) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Waiting:".bold(), info["queueLength"]);
                    println!(
                        "  {} {}/{}",
                        "Active:".bold(),
                        info["activeUsers"],
                        info["maxConcurrentUsers"]
                    );
                    println!("  {} {}", "Free slots:".bold(), info["availableSlots"]);

                    let next = info["nextInQueue"].as_array().cloned().unwrap_or_default();
                    if !next.is_empty() {
                        let rows = next
                            .iter()
                            .map(|entry| -> Result<QueuedUserRow> {
                                let mut row: QueuedUserRow = serde_json::from_value(entry.clone())?;
                                row.wait = formatted_wait(entry);
                                Ok(row)
                            })
                            .collect::<Result<Vec<_>>>()?;
                        println!();
                        println!("{}", Table::new(rows));
                    }
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear without --yes");
            }
            let result = call_rpc(&cli.rpc_url, "admin.clear.v1", json!({})).await?;
            println!(
                "{}",
                format!("✓ {}", result["message"].as_str().unwrap_or("Queue cleared")).green().bold()
            );
        }
    }

    Ok(())
}
