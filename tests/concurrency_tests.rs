//! Concurrency Tests
//!
//! Tests for:
//! - Concurrent session creation (distinct tokens, exact round-robin spread)
//! - Concurrent execution across sessions sharing instances
//! - Sweeping while queries are in flight
//! - Telemetry consistency under contention

use sqldrill::{Config, PracticeService};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn create_service(pool_size: usize) -> Arc<PracticeService> {
    let mut config = Config::default();
    config.pool.size = pool_size;
    Arc::new(PracticeService::from_config(&config).unwrap())
}

// ============================================================================
// Session Creation
// ============================================================================

#[test]
fn test_concurrent_creates_yield_distinct_sessions() {
    let service = create_service(4);
    let num_threads = 16;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = vec![];

    for t in 0..num_threads {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            (0..per_thread)
                .map(|i| service.create_session(&format!("t{t}-u{i}")).unwrap())
                .collect::<Vec<_>>()
        }));
    }

    let tokens: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<&String> = tokens.iter().collect();

    assert_eq!(unique.len(), num_threads * per_thread);
    assert_eq!(service.store().count(), num_threads * per_thread);

    // Strict sequence: 400 acquires over 4 instances is exactly 100 each
    let telemetry = service.health_snapshot().telemetry;
    assert_eq!(telemetry.total_assignments, 400);
    assert!(telemetry.instances.iter().all(|i| i.assignments == 100));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_concurrent_execution_across_sessions() {
    let service = create_service(3);
    let num_threads = 12;
    let queries_per_thread = 20;
    let mut handles = vec![];

    for t in 0..num_threads {
        let service = Arc::clone(&service);
        handles.push(thread::spawn(move || {
            let token = service.create_session(&format!("user{t}")).unwrap();
            for _ in 0..queries_per_thread {
                let result = service
                    .execute_on_session(
                        &token,
                        "SELECT email FROM Person GROUP BY email HAVING COUNT(*) > 1",
                        Some("q2"),
                    )
                    .unwrap();
                assert_eq!(result.is_correct, Some(true));
            }
            token
        }));
    }

    let tokens: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for token in &tokens {
        let info = service.lookup_session(token).unwrap();
        assert_eq!(info.query_count, queries_per_thread);
    }

    let telemetry = service.health_snapshot().telemetry;
    assert_eq!(
        telemetry.total_queries,
        (num_threads as u64) * queries_per_thread
    );
}

#[test]
fn test_same_session_used_from_many_threads() {
    // Requests on one session are serialized on its connection
    let service = create_service(2);
    let token = service.create_session("shared").unwrap();
    let mut handles = vec![];

    for _ in 0..8 {
        let service = Arc::clone(&service);
        let token = token.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                let result = service
                    .execute_on_session(&token, "SELECT COUNT(*) AS n FROM Logs", None)
                    .unwrap();
                assert_eq!(result.rows[0]["n"], "7");
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.lookup_session(&token).unwrap().query_count, 80);
}

// ============================================================================
// Sweeping
// ============================================================================

#[test]
fn test_sweep_during_execution_does_not_break_in_flight_queries() {
    let service = create_service(2);
    let tokens: Vec<String> = (0..10)
        .map(|i| service.create_session(&format!("u{i}")).unwrap())
        .collect();

    let mut handles = vec![];
    for token in tokens {
        let service = Arc::clone(&service);
        handles.push(thread::spawn(move || {
            let mut ok = 0;
            for _ in 0..50 {
                // Once swept, the session is gone; anything else must succeed
                match service.execute_on_session(&token, "SELECT 1 AS one", None) {
                    Ok(result) => {
                        assert!(result.success);
                        ok += 1;
                    }
                    Err(e) => assert!(e.requires_login(), "{e}"),
                }
            }
            ok
        }));
    }

    let sweeper = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            service.sweep_now(0)
        })
    };

    let executed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let swept = sweeper.join().unwrap();

    assert!(swept <= 10);
    assert_eq!(service.store().count(), 10 - swept);
    assert!(executed > 0);
}

#[test]
fn test_terminate_races_with_lookup() {
    let service = create_service(1);
    let token = service.create_session("racer").unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let token = token.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let _ = service.lookup_session(&token);
                }
            })
        })
        .collect();

    let terminator = {
        let service = Arc::clone(&service);
        let token = token.clone();
        thread::spawn(move || service.terminate_session(&token))
    };

    for reader in readers {
        reader.join().unwrap();
    }
    assert!(terminator.join().unwrap());
    assert!(service.lookup_session(&token).is_err());
}
