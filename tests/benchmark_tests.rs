//! Performance benchmarks for the prediction hot paths

use client::session::ClientSession;
use shared::{
    replay, simulate, ArenaBounds, ClientMessage, MovementIntent, PlayerState, ServerMessage,
    Vector2,
};
use std::time::{Duration, Instant};

fn intents(n: usize) -> Vec<MovementIntent> {
    (0..n)
        .map(|i| MovementIntent {
            up: i % 3 == 0,
            down: i % 7 == 0,
            left: i % 2 == 0,
            right: i % 5 == 0,
        })
        .collect()
}

/// Benchmarks the movement simulator
#[test]
fn benchmark_simulate() {
    let bounds = ArenaBounds::default();
    let inputs = intents(64);
    let iterations = 100_000;
    let start = Instant::now();

    let mut position = Vector2::new(384.0, 384.0);
    for i in 0..iterations {
        position = simulate(position, &inputs[i % inputs.len()], &bounds);
    }

    let duration = start.elapsed();
    println!(
        "Simulate: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(bounds.contains(position));
    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks replay of a long unacknowledged backlog (two seconds at 60Hz, many times)
#[test]
fn benchmark_replay_backlog() {
    let bounds = ArenaBounds::default();
    let backlog = intents(120);
    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let base = Vector2::new(100.0 + (i % 500) as f64, 300.0);
        let _ = replay(base, &backlog, &bounds);
    }

    let duration = start.elapsed();
    println!(
        "Replay of {} inputs: {} iterations in {:?} ({:.2} μs/iter)",
        backlog.len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks a full session: predict every tick, reconcile every third tick
#[test]
fn benchmark_session_loop() {
    let bounds = ArenaBounds::default();
    let mut session = ClientSession::new(bounds, Duration::from_millis(200));
    session.handle_message(ServerMessage::Bootstrap {
        id: "me".to_string(),
    });
    session.handle_message(ServerMessage::Update {
        players: vec![PlayerState::new("me", Vector2::new(384.0, 384.0))],
        bullets: Vec::new(),
    });

    let inputs = intents(90);
    let mut sent: Vec<ClientMessage> = Vec::new();
    let mut server_position = Vector2::new(384.0, 384.0);
    let mut acked = 0u64;
    let ticks = 20_000;
    let start = Instant::now();

    for tick in 0..ticks {
        session.tick(inputs[tick % inputs.len()], &mut sent);

        if tick % 3 == 2 {
            // Server is six inputs behind.
            while sent.len() > 6 {
                if let ClientMessage::Movement { sequence, movement } = sent.remove(0) {
                    server_position = simulate(server_position, &movement, &bounds);
                    acked = sequence;
                }
            }
            session.handle_message(ServerMessage::Update {
                players: vec![PlayerState {
                    last_acked_sequence: acked,
                    ..PlayerState::new("me", server_position)
                }],
                bullets: Vec::new(),
            });
        }
    }

    let duration = start.elapsed();
    println!(
        "Session loop: {} ticks in {:?} ({:.2} μs/tick)",
        ticks,
        duration,
        duration.as_micros() as f64 / ticks as f64
    );

    assert!(session.predictor().pending().len() <= 8);
    assert!(duration.as_millis() < 1000);
}
