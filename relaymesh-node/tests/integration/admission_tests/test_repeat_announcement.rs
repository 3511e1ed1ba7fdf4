use relaymesh_node::{CAPACITY_REJECT_REASON, EnvelopeType, PeerId};

use crate::integration::{connect_peer, create_test_node, init_tracing, node_config};
use crate::utils::{SIGNAL_TIMEOUT_MS, wait_for_envelope};

#[tokio::test]
async fn test_repeat_announcement_rejected_when_full() {
    init_tracing();

    let mut node = create_test_node(node_config("me", 2));
    let x = PeerId::from("x");
    connect_peer(&mut node, "x").await;

    // Room to spare: a repeat from a connected peer is ignored
    node.announce_from("x").await;
    node.handle.snapshot().await.unwrap();
    assert!(node.signal_rx.try_recv().is_err());

    connect_peer(&mut node, "y").await;

    // Full: the same repeat gets an answer
    node.announce_from("x").await;
    let reject = wait_for_envelope(
        &mut node.signal_rx,
        EnvelopeType::RejectConnection,
        SIGNAL_TIMEOUT_MS,
    )
    .await
    .expect("Expected a rejection");
    assert_eq!(reject.endpoint, "x");
    assert_eq!(reject.data.as_deref(), Some(CAPACITY_REJECT_REASON));

    // The existing connection survives the rejection
    let snapshot = node.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connected, vec![x.clone(), PeerId::from("y")]);
    assert_eq!(node.connector.connections_for(&x).len(), 1);
    assert!(!node.connector.connection_for(&x).unwrap().is_closed());
}
