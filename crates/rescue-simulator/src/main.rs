//! Rescue Simulator CLI
//!
//! Simulates reporters raising alerts, a dispatcher releasing them, and a
//! pool of ambulance drivers racing to accept, posting to the GraphQL API.
//! The concurrent accept storm is the live probe of the one-winner
//! guarantee: every tick prints how many racers won and lost.

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rescue_domain::Coordinates;
use rescue_simulator::{IncidentGenerator, ResponderPool};

#[derive(Parser, Debug)]
#[command(name = "rescue-simulator")]
#[command(about = "Simulate emergency dispatch traffic and accept races")]
struct Args {
    /// Number of reporting users
    #[arg(short, long, default_value = "3")]
    reporters: usize,

    /// Number of ambulance drivers
    #[arg(short, long, default_value = "4")]
    drivers: usize,

    /// API endpoint
    #[arg(long, default_value = "http://localhost:8080/graphql")]
    api_url: String,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Total run length in ticks
    #[arg(long, default_value = "120")]
    duration: u32,

    /// Dry run (don't post to API)
    #[arg(long)]
    dry_run: bool,
}

/// Thin GraphQL client that carries the identity headers the gateway
/// expects from its authentication collaborator.
#[derive(Clone)]
struct ApiClient {
    http: Client,
    url: String,
}

impl ApiClient {
    fn new(url: &str) -> Self {
        Self {
            http: Client::new(),
            url: url.to_string(),
        }
    }

    async fn call(
        &self,
        caller_id: Uuid,
        role: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value> {
        let response = self
            .http
            .post(&self.url)
            .header("x-caller-id", caller_id.to_string())
            .header("x-caller-role", role)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("API returned status {}", response.status());
        }

        Ok(response.json().await?)
    }
}

/// Extract the first GraphQL error code, if any.
fn error_code(body: &Value) -> Option<&str> {
    body.get("errors")?
        .get(0)?
        .get("extensions")?
        .get("code")?
        .as_str()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rescue_simulator=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let admin_id = Uuid::new_v4();
    let api = ApiClient::new(&args.api_url);

    info!(
        "Starting dispatch simulation: {} reporters, {} drivers",
        args.reporters, args.drivers
    );
    info!("API: {} (dry_run: {})", args.api_url, args.dry_run);
    info!("Tick: {}ms, Duration: {} ticks", args.tick_ms, args.duration);

    let reporters: Vec<Uuid> = (0..args.reporters).map(|_| Uuid::new_v4()).collect();
    let mut incidents = IncidentGenerator::manhattan();
    let mut pool = ResponderPool::new();

    // Register the driver pool
    let base = Coordinates::new(40.7580, -73.9855).expect("valid base position");
    for i in 0..args.drivers {
        let callsign = format!("AMB{:03}", i + 1);
        let driver_id = if args.dry_run {
            Uuid::new_v4()
        } else {
            register_driver(&api, admin_id, &callsign).await?
        };
        pool.add(driver_id, &callsign, base);
        info!("Registered {} as {}", callsign, driver_id);
    }

    // Alerts we created but the dispatcher has not released yet
    let mut pending: VecDeque<Uuid> = VecDeque::new();
    // Alerts released to the pool, oldest first
    let mut open: VecDeque<Uuid> = VecDeque::new();

    for tick in 0..args.duration {
        // Reporters raise incidents
        for reporter_id in &reporters {
            if rand::thread_rng().gen_range(0.0..1.0) > 0.3 {
                continue;
            }
            let incident = incidents.next_incident(*reporter_id);
            let alert_id = if args.dry_run {
                Some(Uuid::new_v4())
            } else {
                create_alert(&api, &incident).await.unwrap_or_else(|e| {
                    warn!("Failed to create alert: {e}");
                    None
                })
            };
            if let Some(alert_id) = alert_id {
                info!(
                    "  {} reported at ({:.4}, {:.4}) -> {}",
                    incident.kind.as_str(),
                    incident.latitude,
                    incident.longitude,
                    alert_id
                );
                pending.push_back(alert_id);
            }
        }

        // The dispatcher persona verifies and releases everything pending
        while let Some(alert_id) = pending.pop_front() {
            if args.dry_run || release_alert(&api, admin_id, alert_id).await {
                open.push_back(alert_id);
            }
        }

        // Every idle driver races for the oldest open alert
        if let Some(&target) = open.front() {
            let racers = pool.idle();
            if !racers.is_empty() {
                let results = run_accept_race(&api, &racers, target, args.dry_run).await;

                let mut winner = None;
                let mut losses = 0;
                for (driver_id, outcome) in results {
                    match outcome {
                        RaceOutcome::Won => {
                            pool.record_win(driver_id, target);
                            winner = Some(driver_id);
                        }
                        RaceOutcome::Lost => {
                            pool.record_loss(driver_id);
                            losses += 1;
                        }
                        RaceOutcome::Error => {}
                    }
                }

                if let Some(winner_id) = winner {
                    open.pop_front();
                    let callsign = pool
                        .get(winner_id)
                        .map(|r| r.callsign.clone())
                        .unwrap_or_default();
                    info!(
                        "  RACE {} | {} won against {} rival(s)",
                        target, callsign, losses
                    );
                }
            }
        }

        // Busy drivers finish their runs and report movement
        for responder in pool.busy() {
            if rand::thread_rng().gen_range(0.0..1.0) < 0.4 {
                let alert_id = responder.busy_with.expect("busy responder has an alert");
                let resolved = args.dry_run
                    || resolve_alert(&api, responder.driver_id, alert_id).await;
                if resolved {
                    pool.record_resolution(responder.driver_id);
                    info!("  {} resolved {}", responder.callsign, alert_id);
                }
            }
        }

        pool.drift_all();
        if !args.dry_run {
            for responder in pool.idle() {
                let _ = update_location(&api, &responder).await;
            }
        }

        // Show tally periodically
        if tick % 30 == 0 && tick > 0 {
            info!("--- ASSIGNMENT TALLY (tick {tick}) ---");
            for entry in pool.tally().iter().take(5) {
                info!(
                    "  {} - {} won / {} lost / {} completed",
                    entry.callsign, entry.wins, entry.losses, entry.completed
                );
            }
        }

        sleep(Duration::from_millis(args.tick_ms)).await;
    }

    info!("Simulation complete!");

    info!("=== FINAL TALLY ({} accept attempts) ===", pool.total_attempts());
    for entry in pool.tally() {
        info!(
            "{} - {} won / {} lost / {} completed",
            entry.callsign, entry.wins, entry.losses, entry.completed
        );
    }

    Ok(())
}

/// Outcome of one driver's accept attempt.
enum RaceOutcome {
    Won,
    Lost,
    Error,
}

/// Register a driver through the API, returning its id.
async fn register_driver(api: &ApiClient, admin_id: Uuid, callsign: &str) -> Result<Uuid> {
    let query = r#"
        mutation RegisterDriver($input: RegisterDriverInput!) {
            registerDriver(input: $input) { id }
        }
    "#;

    let body = api
        .call(
            admin_id,
            "admin",
            query,
            json!({ "input": { "externalId": callsign } }),
        )
        .await?;

    let id = body["data"]["registerDriver"]["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("registerDriver returned no id: {body}"))?;
    Ok(Uuid::parse_str(id)?)
}

/// Report an incident, returning the new alert id.
async fn create_alert(
    api: &ApiClient,
    incident: &rescue_simulator::incident::SimulatedIncident,
) -> Result<Option<Uuid>> {
    let query = r#"
        mutation CreateAlert($input: CreateAlertInput!) {
            createAlert(input: $input) { id }
        }
    "#;

    let body = api
        .call(
            incident.reporter_id,
            "reporter",
            query,
            json!({
                "input": {
                    "alertType": incident.kind.as_str(),
                    "latitude": incident.latitude,
                    "longitude": incident.longitude,
                    "details": incident.details,
                    "impactMagnitude": incident.impact_magnitude,
                }
            }),
        )
        .await?;

    Ok(body["data"]["createAlert"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok()))
}

/// Verify then dispatch an alert; true when the alert reached the pool.
async fn release_alert(api: &ApiClient, admin_id: Uuid, alert_id: Uuid) -> bool {
    let verify = r#"
        mutation Verify($alertId: ID!) { verifyAlert(alertId: $alertId) { status } }
    "#;
    let dispatch = r#"
        mutation Dispatch($alertId: ID!) { dispatchAlert(alertId: $alertId) { status } }
    "#;
    let vars = json!({ "alertId": alert_id.to_string() });

    for query in [verify, dispatch] {
        match api.call(admin_id, "admin", query, vars.clone()).await {
            Ok(body) if error_code(&body).is_none() => {}
            Ok(body) => {
                warn!("Failed to release {alert_id}: {:?}", error_code(&body));
                return false;
            }
            Err(e) => {
                warn!("Failed to release {alert_id}: {e}");
                return false;
            }
        }
    }
    true
}

/// Fire every racer's accept concurrently and collect outcomes.
async fn run_accept_race(
    api: &ApiClient,
    racers: &[rescue_simulator::responder::SimulatedResponder],
    alert_id: Uuid,
    dry_run: bool,
) -> Vec<(Uuid, RaceOutcome)> {
    if dry_run {
        // Without a server, the first racer stands in for the CAS winner
        return racers
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let outcome = if i == 0 {
                    RaceOutcome::Won
                } else {
                    RaceOutcome::Lost
                };
                (r.driver_id, outcome)
            })
            .collect();
    }

    const ACCEPT_QUERY: &str = r#"
        mutation Accept($input: AcceptAlertInput!) {
            acceptAlert(input: $input) { id status }
        }
    "#;

    // Spawned tasks, not sequential awaits: the claims must overlap for
    // this to probe anything.
    let mut handles = Vec::new();
    for racer in racers {
        let api = api.clone();
        let driver_id = racer.driver_id;
        let vars = json!({
            "input": {
                "alertId": alert_id.to_string(),
                "driverId": driver_id.to_string(),
            }
        });
        handles.push(tokio::spawn(async move {
            (driver_id, api.call(driver_id, "driver", ACCEPT_QUERY, vars).await)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        let Ok((driver_id, response)) = handle.await else {
            continue;
        };
        let outcome = match response {
            Ok(body) => match error_code(&body) {
                None => RaceOutcome::Won,
                Some("ALREADY_ASSIGNED") => RaceOutcome::Lost,
                Some(code) => {
                    warn!("{driver_id} accept failed with {code}");
                    RaceOutcome::Error
                }
            },
            Err(e) => {
                warn!("{driver_id} accept request failed: {e}");
                RaceOutcome::Error
            }
        };
        results.push((driver_id, outcome));
    }
    results
}

/// Resolve an accepted alert; true on success.
async fn resolve_alert(api: &ApiClient, driver_id: Uuid, alert_id: Uuid) -> bool {
    let query = r#"
        mutation Resolve($input: ResolveAlertInput!) {
            resolveAlert(input: $input) { status }
        }
    "#;
    let vars = json!({
        "input": {
            "alertId": alert_id.to_string(),
            "driverId": driver_id.to_string(),
        }
    });

    match api.call(driver_id, "driver", query, vars).await {
        Ok(body) => error_code(&body).is_none(),
        Err(e) => {
            warn!("{driver_id} resolve request failed: {e}");
            false
        }
    }
}

/// Push a responder's drifted position to the API.
async fn update_location(
    api: &ApiClient,
    responder: &rescue_simulator::responder::SimulatedResponder,
) -> Result<()> {
    let query = r#"
        mutation Move($input: UpdateDriverLocationInput!) {
            updateDriverLocation(input: $input) { id }
        }
    "#;
    let vars = json!({
        "input": {
            "driverId": responder.driver_id.to_string(),
            "latitude": responder.position.latitude,
            "longitude": responder.position.longitude,
        }
    });

    api.call(responder.driver_id, "driver", query, vars).await?;
    Ok(())
}
