//! Load test for the arena server.
//!
//! Spawns fake WebSocket clients that wander around, shoot at random and
//! count the snapshots they receive.
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --shoot-rate R   Shots per second per client (default: 2)
//!   --url URL        Server URL (default: ws://127.0.0.1:8080/ws)

use arena_shared::protocol::{ClientMsg, StateMsg};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    inits_received: AtomicU64,
    snapshots_received: AtomicU64,
    entities_seen: AtomicU64,
    inputs_sent: AtomicU64,
    errors: AtomicU64,
}

async fn run_client(
    client_id: u32,
    url: String,
    shoot_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let shoot_interval = if shoot_rate > 0.0 {
        Duration::from_secs_f64(1.0 / shoot_rate)
    } else {
        Duration::from_secs(3600)
    };
    let mut shoot_timer = tokio::time::interval(shoot_interval);
    shoot_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut steer_timer = tokio::time::interval(Duration::from_millis(500));

    let test_end = tokio::time::Instant::now() + duration;

    loop {
        let outgoing = tokio::select! {
            _ = tokio::time::sleep_until(test_end) => break,
            _ = shoot_timer.tick() => {
                let angle = rand::thread_rng().gen_range(0.0..std::f64::consts::TAU);
                Some(ClientMsg::Shoot { dir_x: angle.cos(), dir_y: angle.sin() })
            }
            _ = steer_timer.tick() => {
                let mut rng = rand::thread_rng();
                Some(ClientMsg::Move {
                    velocity_x: rng.gen_range(-1.0..=1.0),
                    velocity_y: rng.gen_range(-1.0..=1.0),
                })
            }
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.contains("\"type\":\"init\"") {
                            metrics.inits_received.fetch_add(1, Ordering::Relaxed);
                        } else if let Ok(state) = serde_json::from_str::<StateMsg>(&text) {
                            metrics.snapshots_received.fetch_add(1, Ordering::Relaxed);
                            let n = state.players.len() + state.bullets.len() + state.enemies.len();
                            metrics.entities_seen.fetch_add(n as u64, Ordering::Relaxed);
                        }
                        None
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => None,
                }
            }
        };

        if let Some(msg) = outgoing {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws.send(Message::Text(json.into())).await.is_ok() {
                metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
            } else {
                metrics.errors.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

fn print_stats(label: &str, metrics: &Metrics) {
    let snapshots = metrics.snapshots_received.load(Ordering::Relaxed);
    let entities = metrics.entities_seen.load(Ordering::Relaxed);
    let avg_entities = if snapshots > 0 { entities / snapshots } else { 0 };
    println!(
        "[{}] connected={}, inits={}, snapshots={}, inputs={}, errors={}, avg_entities={}",
        label,
        metrics.connected.load(Ordering::Relaxed),
        metrics.inits_received.load(Ordering::Relaxed),
        snapshots,
        metrics.inputs_sent.load(Ordering::Relaxed),
        metrics.errors.load(Ordering::Relaxed),
        avg_entities
    );
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut shoot_rate: f64 = 2.0;
    let mut url = "ws://127.0.0.1:8080/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--shoot-rate" => {
                i += 1;
                shoot_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(2.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Arena Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Shoot rate: {}/s per client", shoot_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);
    let start = Instant::now();

    let mut handles = Vec::with_capacity(num_clients as usize);
    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(run_client(
            client_id, url, shoot_rate, duration, metrics,
        )));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let stats_metrics = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            print_stats(&format!("{:3}s", start.elapsed().as_secs()), &stats_metrics);
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    print_stats("final", &metrics);
    let snapshots = metrics.snapshots_received.load(Ordering::Relaxed);
    let elapsed = start.elapsed().as_secs_f64();
    if num_clients > 0 && elapsed > 0.0 {
        println!(
            "Snapshot rate per client: {:.1}/s",
            snapshots as f64 / num_clients as f64 / elapsed
        );
    }
}
