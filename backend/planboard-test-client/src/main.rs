// src/main.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct Assignment {
    id: String,
    task_id: String,
    employee_id: String,
    half_day: String,
    column_start: String,
    hours: String,
}

#[derive(Debug, Deserialize)]
struct MoveOutcome {
    source: Vec<Assignment>,
    destination: Vec<Assignment>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn print_slot(label: &str, assignments: &[Assignment]) {
    println!("{} ({} tasks):", label, assignments.len());
    for a in assignments {
        println!(
            "  {} {} [{}/{}] column {} for {}h",
            a.id, a.task_id, a.employee_id, a.half_day, a.column_start, a.hours
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url =
        std::env::var("PLANBOARD_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let slot_url = format!("{}/api/slots/E1/2025-04-01/morning", base_url);
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health = client.get(format!("{}/health", base_url)).send().await?;
    println!("Health check: {} {}", health.status(), health.text().await?);

    // Test 2: Fill the morning slot
    println!("\n🔍 Dropping four tasks into {}...", slot_url);
    let mut arrangement: Vec<Assignment> = Vec::new();
    for (column, (task_id, hours)) in [("DESIGN", 2), ("REVIEW", 1), ("SUPPORT", 1), ("PLANNING", 1)]
        .iter()
        .enumerate()
    {
        let response = client
            .post(format!("{}/tasks", slot_url))
            .json(&json!({
                "task_id": task_id,
                "title": format!("{} work", task_id),
                "hours": hours,
                "target_column": column,
            }))
            .send()
            .await?;
        println!("Drop {} -> {}", task_id, response.status());
        arrangement = response.json().await?;
    }
    print_slot("Morning slot", &arrangement);

    // Test 3: A fifth task must be rejected
    println!("\n🔍 Dropping a fifth task...");
    let response = client
        .post(format!("{}/validate", slot_url))
        .json(&json!({ "hours": 1 }))
        .send()
        .await?;
    println!("Validate: {}", response.text().await?);

    let response = client
        .post(format!("{}/tasks", slot_url))
        .json(&json!({ "task_id": "EXTRA", "title": "Extra work", "target_column": 0 }))
        .send()
        .await?;
    if response.status() == StatusCode::CONFLICT {
        let body: ErrorBody = response.json().await?;
        println!("✅ Rejected as expected: {}", body.error);
    } else {
        println!("❌ Expected 409, got {}", response.status());
    }

    // Test 4: Move the first task to the afternoon
    if let Some(first) = arrangement.first() {
        println!("\n🔍 Moving {} to the afternoon...", first.id);
        let outcome: MoveOutcome = client
            .post(format!("{}/api/assignments/{}/move", base_url, first.id))
            .json(&json!({
                "employee_id": "E1",
                "date": "2025-04-01",
                "half_day": "afternoon",
                "drop_x": 10.0,
                "slot_bounds": { "left": 0.0, "width": 400.0 },
            }))
            .send()
            .await?
            .json()
            .await?;
        print_slot("Morning slot", &outcome.source);
        print_slot("Afternoon slot", &outcome.destination);
        arrangement = outcome.source;
    }

    // Test 5: Remove a task and check the slot closes the gap
    if let Some(first) = arrangement.first() {
        println!("\n🔍 Removing {}...", first.id);
        let remaining: Vec<Assignment> = client
            .delete(format!("{}/api/assignments/{}", base_url, first.id))
            .send()
            .await?
            .json()
            .await?;
        print_slot("Morning slot", &remaining);
    }

    println!("\n✅ Smoke test finished");
    Ok(())
}
