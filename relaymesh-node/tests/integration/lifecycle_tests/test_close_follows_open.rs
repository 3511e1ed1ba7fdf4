use relaymesh_node::PeerId;

use crate::integration::{connect_peer, create_test_node, init_tracing, node_config};
use crate::utils::{BehaviorEvent, SIGNAL_TIMEOUT_MS, wait_for_snapshot};

#[tokio::test]
async fn test_close_follows_open() {
    init_tracing();

    let mut node = create_test_node(node_config("me", 3));
    let peer = PeerId::from("x");
    connect_peer(&mut node, "x").await;

    node.connector.disconnect(&peer).await;

    assert!(node.behavior.wait_for_events(2, 5000).await);
    assert_eq!(
        node.behavior.events().await,
        vec![BehaviorEvent::Open(peer.clone()), BehaviorEvent::Close(peer.clone())]
    );

    let snapshot = wait_for_snapshot(&node.handle, SIGNAL_TIMEOUT_MS, |s| {
        s.connected.is_empty()
    })
    .await
    .unwrap();
    assert!(snapshot.session(&peer).is_none());
    assert!(node.connector.connection_for(&peer).unwrap().is_closed());

    // A second close for the same peer is a no-op
    node.connector.disconnect(&peer).await;
    node.handle.snapshot().await.unwrap();
    assert_eq!(node.behavior.events().await.len(), 2);
}

#[tokio::test]
async fn test_removal_keeps_connection_order() {
    init_tracing();

    let mut node = create_test_node(node_config("me", 3));
    for peer in ["a", "b", "c"] {
        connect_peer(&mut node, peer).await;
    }

    node.connector.disconnect(&PeerId::from("b")).await;
    let snapshot = wait_for_snapshot(&node.handle, SIGNAL_TIMEOUT_MS, |s| {
        s.connected.len() == 2
    })
    .await
    .unwrap();

    assert_eq!(snapshot.connected, vec![PeerId::from("a"), PeerId::from("c")]);
    assert_eq!(
        node.handle.connected_peers(),
        vec![PeerId::from("a"), PeerId::from("c")]
    );
}
