//! Load test for the maze server.
//!
//! Spawns multiple scripted WebSocket clients that:
//! - Connect and send a name
//! - Periodically send random move / shoot actions
//! - Receive and count update broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 20)
//!   --duration S     Test duration in seconds (default: 30)
//!   --action-rate R  Actions per second per client (default: 4)
//!   --tick-ms T      Server tick interval, for the delivery estimate (default: 250)
//!   --url URL        Server URL (default: ws://127.0.0.1:5555/ws)

use futures_util::{SinkExt, StreamExt};
use maze_shared::direction::Direction;
use maze_shared::protocol::ClientMsg;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    updates_received: AtomicU64,
    actions_sent: AtomicU64,
    errors: AtomicU64,
    total_bullets_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    action_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

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

    if ws
        .send(Message::Text(format!("bot{client_id}").into()))
        .await
        .is_err()
    {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // Wait for init before doing anything else
    let got_init = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if text.contains("\"type\":\"init\"") {
                        return true;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return false,
                _ => {}
            }
        }
        false
    })
    .await;

    if got_init != Ok(true) {
        if client_id < 3 {
            eprintln!("Client {} failed to get init", client_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let action_interval = if action_rate > 0.0 {
        Duration::from_secs_f64(1.0 / action_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut action_timer = tokio::time::interval(action_interval);
    action_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64);

    while Instant::now() < test_end {
        tokio::select! {
            _ = action_timer.tick() => {
                let action = if rng.gen_bool(0.25) {
                    ClientMsg::Shoot
                } else {
                    ClientMsg::Move { direction: Direction::random(&mut rng) }
                };
                let sent = match serde_json::to_string(&action) {
                    Ok(json) => ws.send(Message::Text(json.into())).await.is_ok(),
                    Err(_) => false,
                };
                if sent {
                    metrics.actions_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                            if value["type"] == "update" {
                                metrics.updates_received.fetch_add(1, Ordering::Relaxed);
                                let bullets = value["bullets"].as_array().map_or(0, |b| b.len());
                                metrics.total_bullets_seen.fetch_add(bullets as u64, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 20;
    let mut duration_secs: u64 = 30;
    let mut action_rate: f64 = 4.0;
    let mut tick_ms: u64 = 250;
    let mut url = "ws://127.0.0.1:5555/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--action-rate" => {
                i += 1;
                action_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(4.0);
            }
            "--tick-ms" => {
                i += 1;
                tick_ms = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(250).max(1);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Maze Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Action rate: {}/s per client", action_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, action_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            println!(
                "[{:3}s] connected={}, msgs={}, updates={}, actions={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.updates_received.load(Ordering::Relaxed),
                metrics_clone.actions_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let updates = metrics.updates_received.load(Ordering::Relaxed);
    let actions = metrics.actions_sent.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let bullets = metrics.total_bullets_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!();
    println!("=== Final Results ===");
    println!("Total messages received: {}", msgs);
    println!("Total update messages: {}", updates);
    println!("Total actions sent: {}", actions);
    println!("Total errors: {}", errors);
    if updates > 0 {
        println!("Average bullets in flight: {:.1}", bullets as f64 / updates as f64);
    }
    if latency_count > 0 {
        println!("Average join latency: {}ms", latency_sum / latency_count);
    }

    // Tick updates only; action-triggered updates push the real rate higher
    let tick_updates = duration_secs as f64 * 1000.0 / tick_ms as f64;
    let updates_per_client = updates as f64 / num_clients.max(1) as f64;
    println!();
    println!("Updates per client: {:.1}", updates_per_client);
    println!("Tick updates expected per client: {:.1}", tick_updates);
    if tick_updates > 0.0 {
        println!(
            "Tick delivery rate: {:.1}%",
            updates_per_client / tick_updates * 100.0
        );
    }
}
