use rocket::http::{ContentType, Header, Status};

use crate::common::{create_room, envelope_body, test_client};

/// Create a room then delete it with the correct token, alone.
#[test]
fn scenario_create_and_solo_destroy() {
    let client = test_client();
    let (hash, _peer, token) = create_room(&client, "H1", 120);

    let res = client
        .delete(format!("/rooms/{hash}"))
        .header(Header::new("X-Delete-Token", token))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["deleted"], true);
}

/// A creates, B joins, B sends, A polls and sees it; a subsequent poll
/// past that `ts` is empty.
#[test]
fn scenario_poll_interop() {
    let client = test_client();
    let (hash, peer_a, _token) = create_room(&client, "H3", 120);

    let res = client.post(format!("/rooms/{hash}/join")).dispatch();
    let joined: serde_json::Value = res.into_json().unwrap();
    let peer_b = joined["peerId"].as_str().unwrap().to_string();
    assert_eq!(joined["peerCount"], 2);

    client
        .post(format!("/rooms/{hash}/send"))
        .header(ContentType::JSON)
        .body(envelope_body(&hash, &peer_b, "cipher", "nonce", 200))
        .dispatch();

    let res = client
        .get(format!("/rooms/{hash}/poll?since=0&peerId={peer_a}"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["peerCount"], 2);

    let res = client
        .get(format!("/rooms/{hash}/poll?since=200&peerId={peer_a}"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

/// The 201st message evicts the 1st from the backlog, so it is no longer
/// visible to any poller.
#[test]
fn the_201st_message_evicts_the_1st() {
    let client = test_client();
    let (hash, peer, _token) = create_room(&client, "backlog", 3600);

    for ts in 0..201 {
        client
            .post(format!("/rooms/{hash}/send"))
            .header(ContentType::JSON)
            .body(envelope_body(&hash, &peer, "x", "n", ts))
            .dispatch();
    }

    let res = client
        .get(format!("/rooms/{hash}/poll?since=-1"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 200);
    // ts=0 (the 1st) was evicted; the oldest surviving entry is ts=1.
    assert_eq!(messages[0]["ts"], 1);
    assert_eq!(messages[199]["ts"], 200);
}

/// Deleting a never-joined room's token-holder room is unaffected by a
/// non-creator's forged delete attempt.
#[test]
fn forged_delete_leaves_room_intact() {
    let client = test_client();
    let (hash, _peer, _token) = create_room(&client, "H4", 120);

    let res = client
        .delete(format!("/rooms/{hash}"))
        .header(Header::new("X-Delete-Token", "guess"))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "INVALID_DELETE_TOKEN");

    // Still joinable afterwards — the room was never touched.
    let res = client.post(format!("/rooms/{hash}/join")).dispatch();
    assert_eq!(res.status(), Status::Ok);
}

/// An oversized request body (mirroring the push transport's 64 KiB frame
/// cap) is rejected without reaching the handler.
#[test]
fn oversized_body_is_rejected() {
    let client = test_client();
    let (hash, peer, _token) = create_room(&client, "oversized", 120);

    let huge_payload = "x".repeat(70 * 1024);
    let res = client
        .post(format!("/rooms/{hash}/send"))
        .header(ContentType::JSON)
        .body(envelope_body(&hash, &peer, &huge_payload, "n", 1))
        .dispatch();
    assert_ne!(res.status(), Status::Ok);
}
