use crate::integration::init_tracing;
use crate::utils::{TestClient, create_test_router};
use droplink_core::{ClientEnvelope, ServerEnvelope, UserId};

#[test]
fn offer_reaches_only_the_target() {
    init_tracing();
    let router = create_test_router();

    let mut a = TestClient::connect(&router);
    let room_id = a.create_room("pair", "General", true);
    let a_id = a.join(room_id, "a");

    let mut b = TestClient::connect(&router);
    let b_id = b.join(room_id, "b");

    let mut c = TestClient::connect(&router);
    c.join(room_id, "c");
    a.drain();
    b.drain();

    a.send(ClientEnvelope::CreateOffer {
        sdp: "v=0 offer".into(),
        target_user_id: b_id,
        user_id: a_id,
        user_name: "a".into(),
    });

    match b.recv() {
        ServerEnvelope::Offer {
            sdp,
            user_id,
            user_name,
        } => {
            assert_eq!(sdp, "v=0 offer");
            assert_eq!(user_id, a_id);
            assert_eq!(user_name, "a");
        }
        other => panic!("expected offer, got {other:?}"),
    }
    assert!(c.try_recv().is_none(), "offer must not leak to third parties");
    assert!(a.try_recv().is_none(), "no error expected for the sender");
}

#[test]
fn answer_is_relayed_with_sender_identity() {
    init_tracing();
    let router = create_test_router();

    let mut a = TestClient::connect(&router);
    let room_id = a.create_room("pair", "General", true);
    let a_id = a.join(room_id, "a");

    let mut b = TestClient::connect(&router);
    let b_id = b.join(room_id, "b");
    a.drain();

    b.send(ClientEnvelope::CreateAnswer {
        sdp: "v=0 answer".into(),
        target_user_id: a_id,
        user_id: b_id,
        user_name: "b".into(),
    });

    assert!(matches!(
        a.recv(),
        ServerEnvelope::Answer { user_id, .. } if user_id == b_id
    ));
}

#[test]
fn candidate_forwarding_is_targeted() {
    init_tracing();
    let router = create_test_router();

    let mut a = TestClient::connect(&router);
    let room_id = a.create_room("pair", "General", true);
    let a_id = a.join(room_id, "a");

    let mut b = TestClient::connect(&router);
    let b_id = b.join(room_id, "b");
    a.drain();

    a.send(ClientEnvelope::IceCandidate {
        candidate: "candidate:1".into(),
        target_user_id: b_id,
        user_id: a_id,
    });

    match b.recv() {
        ServerEnvelope::IceCandidate { candidate, user_id } => {
            assert_eq!(candidate, "candidate:1");
            assert_eq!(user_id, a_id);
        }
        other => panic!("expected ice-candidate, got {other:?}"),
    }
}

#[test]
fn unresolvable_target_reports_an_error() {
    init_tracing();
    let router = create_test_router();

    let mut a = TestClient::connect(&router);
    let room_id = a.create_room("alone", "General", true);
    let a_id = a.join(room_id, "a");

    a.send(ClientEnvelope::CreateOffer {
        sdp: "v=0".into(),
        target_user_id: UserId::new(),
        user_id: a_id,
        user_name: "a".into(),
    });

    assert!(matches!(
        a.recv(),
        ServerEnvelope::Error { message } if message == "Room or target user not found"
    ));
}

#[test]
fn target_whose_connection_closed_reports_an_error() {
    init_tracing();
    let router = create_test_router();

    let mut a = TestClient::connect(&router);
    let room_id = a.create_room("pair", "General", true);
    let a_id = a.join(room_id, "a");

    let mut b = TestClient::connect(&router);
    let b_id = b.join(room_id, "b");
    a.drain();

    b.disconnect();
    a.drain(); // member-left notice

    a.send(ClientEnvelope::IceCandidate {
        candidate: "candidate:1".into(),
        target_user_id: b_id,
        user_id: a_id,
    });

    assert!(matches!(
        a.recv(),
        ServerEnvelope::Error { message } if message == "Room or target user not found"
    ));
}
