use relaymesh_node::{PeerId, RelayError, RelayLink, RoomId, command_channel};

use crate::integration::{ROOM, init_tracing};
use crate::utils::TestRelay;

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    init_tracing();

    let relay = TestRelay::start().await;
    let id = PeerId::from("twin");
    let room = RoomId::from(ROOM);

    let (tx, _rx) = command_channel();
    let _first = RelayLink::connect(&relay.url(), &id, &room, tx.clone())
        .await
        .expect("first join failed");

    let err = RelayLink::connect(&relay.url(), &id, &room, tx)
        .await
        .err()
        .expect("second join should fail");
    assert!(matches!(err, RelayError::Rejected(409)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_unreachable_relay() {
    init_tracing();

    // Grab a free port and release it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, _rx) = command_channel();
    let err = RelayLink::connect(
        &format!("ws://{addr}"),
        &PeerId::from("a"),
        &RoomId::from(ROOM),
        tx,
    )
    .await
    .err()
    .expect("join should fail");
    assert!(matches!(err, RelayError::Join(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_invalid_relay_url() {
    let (tx, _rx) = command_channel();
    let err = RelayLink::connect("::not a url::", &PeerId::from("a"), &RoomId::from(ROOM), tx)
        .await
        .err()
        .expect("join should fail");
    assert!(matches!(err, RelayError::InvalidUrl(_)));
    assert_eq!(err.exit_code(), 2);
}
