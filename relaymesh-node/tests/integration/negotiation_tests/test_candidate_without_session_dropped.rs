use relaymesh_node::{EnvelopeType, PeerId};

use crate::integration::{create_test_node, init_tracing, node_config};

#[tokio::test]
async fn test_candidate_without_session_dropped() {
    init_tracing();

    let node = create_test_node(node_config("me", 3));
    let before = node.handle.snapshot().await.unwrap();

    node.deliver_from(
        "Z",
        EnvelopeType::Candidate,
        "candidate:1 1 udp 2130706431 10.0.0.9 5000 typ host",
    )
    .await;
    node.deliver_from("Z", EnvelopeType::Answer, "stray-answer")
        .await;

    // The snapshot is served after both envelopes were handled
    let after = node.handle.snapshot().await.unwrap();
    assert_eq!(before, after);
    assert!(after.session(&PeerId::from("Z")).is_none());
    assert_eq!(node.connector.connect_count(), 0);
    assert!(node.signaling.envelopes().await.is_empty());
}
