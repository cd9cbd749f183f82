use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use gossip_rs::{api::config::GossipConfig, Members, Peer, Shutdown};

fn create_members(fail_ms: u64, cleanup_ms: u64) -> Members {
    let config = GossipConfig::builder()
        .with_id("NODE_A")
        .with_addr("127.0.0.1:5000")
        .with_fail_timeout(Duration::from_millis(fail_ms))
        .with_cleanup_timeout(Duration::from_millis(cleanup_ms))
        .with_round_interval(Duration::ZERO)
        .with_sweep_interval(Duration::from_millis(2))
        .build();
    Members::new(&config)
}

fn sleep_until(start: Instant, ms: u64) {
    let target = start + Duration::from_millis(ms);
    let now = Instant::now();
    if target > now {
        thread::sleep(target - now);
    }
}

#[test]
fn test_members_silent_peer_is_suspected_then_evicted() {
    let members = create_members(50, 70);
    let start = Instant::now();
    members.add_peer(Peer::new("NODE_B", "127.0.0.1:5001"));
    members.start().unwrap();

    sleep_until(start, 40);
    assert!(members.is_alive("NODE_B"));

    sleep_until(start, 70);
    assert!(members.is_suspected("NODE_B"));
    assert!(!members.is_alive("NODE_B"));

    sleep_until(start, 140);
    assert!(!members.is_alive("NODE_B"));
    assert!(!members.is_suspected("NODE_B"));

    assert!(members.is_alive("NODE_A"));
    members.stop();
}

#[test]
fn test_members_beating_peer_stays_alive() {
    let members = Arc::new(create_members(50, 70));
    let shutdown = Shutdown::new();
    members.start_with(shutdown.clone()).unwrap();

    let beater = {
        let members = members.clone();
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            let mut heartbeat = 1;
            while !shutdown.wait_timeout(Duration::from_millis(10)) {
                heartbeat += 1;
                members.heartbeat(Peer::with_heartbeat("NODE_B", "127.0.0.1:5001", heartbeat));
            }
        })
    };

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(200) {
        assert!(members.is_alive("NODE_B"));
        thread::sleep(Duration::from_millis(5));
    }

    shutdown.cancel();
    beater.join().unwrap();
    members.stop();
}

#[test]
fn test_members_suspected_peer_recovers_and_is_not_evicted() {
    let members = create_members(50, 70);
    members.add_peer(Peer::new("NODE_B", "127.0.0.1:5001"));
    members.start().unwrap();

    let start = Instant::now();
    while !members.is_suspected("NODE_B") {
        assert!(start.elapsed() < Duration::from_millis(1000));
        thread::sleep(Duration::from_millis(2));
    }

    members.heartbeat(Peer::with_heartbeat("NODE_B", "127.0.0.1:5001", 2));
    assert!(members.is_alive("NODE_B"));

    // Recovery grants a fresh deadline, so the next sweeps must leave it alone.
    thread::sleep(Duration::from_millis(20));
    assert!(members.is_alive("NODE_B"));
    assert_eq!(members.get_peer("NODE_B").unwrap().get_heartbeat(), 2);

    members.stop();
}

#[test]
fn test_members_self_is_never_suspected() {
    let members = create_members(10, 20);
    members.start().unwrap();

    thread::sleep(Duration::from_millis(100));

    assert!(members.is_alive("NODE_A"));
    assert!(!members.is_suspected("NODE_A"));
    assert_eq!(members.size(), 1);
    members.stop();
}

#[test]
fn test_members_merge_from_concurrent_writers() {
    let members = Arc::new(create_members(1000, 2000));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let members = members.clone();
            thread::spawn(move || {
                for heartbeat in 1..=100u64 {
                    members.heartbeat(Peer::with_heartbeat(
                        format!("NODE_{w}"),
                        format!("127.0.0.1:60{w:02}"),
                        heartbeat,
                    ));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(members.size(), 5);
    for w in 0..4 {
        let peer = members.get_peer(format!("NODE_{w}")).unwrap();
        assert_eq!(peer.get_heartbeat(), 100);
    }
}
