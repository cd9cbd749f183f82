use std::time::Duration;

use gossip_rs::api::{config::GossipConfig, gossip::GossipCluster};

async fn create_node(id: &str, seeds: &[(&str, &str)]) -> GossipCluster {
    let config = GossipConfig::builder()
        .with_id(id)
        .with_addr("127.0.0.1:0")
        .with_seeds(seeds.iter().copied())
        .with_fail_timeout(Duration::from_millis(50))
        .with_cleanup_timeout(Duration::from_millis(500))
        .with_round_interval(Duration::from_millis(20))
        .with_sweep_interval(Duration::from_millis(5))
        .with_gossip_interval(Duration::from_millis(10))
        .build();
    GossipCluster::try_new(config).await.unwrap()
}

macro_rules! assert_eventually {
    ($ms:expr, $cond:expr) => {
        let result = tokio::time::timeout(Duration::from_millis($ms), async {
            while !$cond {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        if result.is_err() {
            panic!("condition not met within {}ms", $ms)
        }
    };
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gossip_cluster_converges() {
    let node1 = create_node("NODE_1", &[]).await;
    let node2 = create_node("NODE_2", &[("NODE_1", node1.addr())]).await;
    let node3 = create_node("NODE_3", &[("NODE_1", node1.addr())]).await;

    node1.run().await.unwrap();
    node2.run().await.unwrap();
    node3.run().await.unwrap();

    assert_eventually!(2000, node1.members().size() == 3);
    assert_eventually!(2000, node2.members().size() == 3);
    assert_eventually!(2000, node3.members().size() == 3);

    let status = node1.status_json().unwrap();
    assert!(status.contains("\"NODE_2\""));
    assert!(status.contains("\"NODE_3\""));

    node1.shutdown();
    node2.shutdown();
    node3.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gossip_cluster_silent_node_is_suspected() {
    let node1 = create_node("NODE_1", &[]).await;
    let node2 = create_node("NODE_2", &[("NODE_1", node1.addr())]).await;
    let node3 = create_node("NODE_3", &[("NODE_1", node1.addr())]).await;

    node1.run().await.unwrap();
    node2.run().await.unwrap();
    node3.run().await.unwrap();

    assert_eventually!(2000, node1.members().is_alive("NODE_3"));
    assert_eventually!(2000, node2.members().is_alive("NODE_3"));

    tracing::info!("[{}] is shutting down...", node3.addr());
    node3.shutdown();

    assert_eventually!(2000, node1.members().is_suspected("NODE_3"));
    assert_eventually!(2000, node2.members().is_suspected("NODE_3"));

    node1.shutdown();
    node2.shutdown();
}
