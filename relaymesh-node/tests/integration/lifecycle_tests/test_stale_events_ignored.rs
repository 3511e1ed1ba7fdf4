use relaymesh_node::{EnvelopeType, PeerId, Role, TransportEvent};

use crate::integration::{create_test_node, init_tracing, node_config};
use crate::utils::{SIGNAL_TIMEOUT_MS, wait_for_envelope};

#[tokio::test]
async fn test_stale_events_ignored() {
    init_tracing();

    let mut node = create_test_node(node_config("a", 3));
    let peer = PeerId::from("b");

    // Our offer loses to theirs, so the first connection is replaced
    node.announce_from("b").await;
    wait_for_envelope(&mut node.signal_rx, EnvelopeType::Offer, SIGNAL_TIMEOUT_MS)
        .await
        .unwrap();
    node.deliver_from("b", EnvelopeType::Offer, "their-offer")
        .await;
    wait_for_envelope(&mut node.signal_rx, EnvelopeType::Answer, SIGNAL_TIMEOUT_MS)
        .await
        .unwrap();

    let connections = node.connector.connections_for(&peer);
    let (old, current) = (&connections[0], &connections[1]);

    // Late reports from the replaced connection change nothing
    node.connector
        .emit_as(old, TransportEvent::Disconnected(old.tag.clone()))
        .await;
    node.connector
        .emit_as(old, TransportEvent::ChannelOpen(old.tag.clone()))
        .await;
    node.connector
        .emit_as(current, TransportEvent::ChannelOpen(current.tag.clone()))
        .await;

    assert!(node.behavior.wait_for_events(1, 5000).await);
    let snapshot = node.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connected, vec![peer.clone()]);
    assert_eq!(snapshot.session(&peer).unwrap().role, Role::Responder);
    assert!(!current.is_closed());
    assert_eq!(node.behavior.events().await.len(), 1);
}
