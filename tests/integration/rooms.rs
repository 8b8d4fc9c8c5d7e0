use rocket::http::{ContentType, Header, Status};

use crate::common::{create_room, test_client};

#[test]
fn create_room_returns_peer_and_token() {
    let client = test_client();
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .body(r#"{"roomHash":"H1","ttl":120}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["roomHash"], "H1");
    assert!(!body["peerId"].as_str().unwrap().is_empty());
    assert!(!body["deleteToken"].as_str().unwrap().is_empty());
    assert_eq!(body["peerCount"], 1);
}

#[test]
fn duplicate_hash_yields_generic_room_error() {
    let client = test_client();
    create_room(&client, "dup", 120);
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .body(r#"{"roomHash":"dup","ttl":120}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Conflict);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "ROOM_ERROR");
}

#[test]
fn ttl_is_clamped_into_bounds() {
    // There is no direct way to read back the clamped ttl, but a short ttl
    // request must still succeed (clamped up to the 60s floor) rather than
    // being rejected as invalid.
    let client = test_client();
    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .body(r#"{"roomHash":"short-ttl","ttl":1}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
}

#[test]
fn join_unknown_room_yields_generic_room_error() {
    let client = test_client();
    let res = client.post("/rooms/never-existed/join").dispatch();
    assert_eq!(res.status(), Status::NotFound);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "ROOM_ERROR");
}

#[test]
fn join_increments_peer_count() {
    let client = test_client();
    create_room(&client, "h2", 120);
    let res = client.post("/rooms/h2/join").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["roomHash"], "h2");
    assert_eq!(body["peerCount"], 2);
}

#[test]
fn room_full_refuses_51st_member() {
    let client = test_client();
    create_room(&client, "full", 120);
    for _ in 0..49 {
        let res = client.post("/rooms/full/join").dispatch();
        assert_eq!(res.status(), Status::Ok);
    }
    let res = client.post("/rooms/full/join").dispatch();
    assert_eq!(res.status(), Status::Forbidden);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "ROOM_FULL");
}

#[test]
fn delete_with_wrong_token_is_rejected() {
    let client = test_client();
    create_room(&client, "h4", 120);
    let res = client
        .delete("/rooms/h4")
        .header(Header::new("X-Delete-Token", "guess"))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "INVALID_DELETE_TOKEN");

    // Room is unchanged: still joinable.
    let res = client.post("/rooms/h4/join").dispatch();
    assert_eq!(res.status(), Status::Ok);
}

#[test]
fn delete_with_correct_token_destroys_room() {
    let client = test_client();
    let (hash, _peer, token) = create_room(&client, "h5", 120);
    let res = client
        .delete(format!("/rooms/{hash}"))
        .header(Header::new("X-Delete-Token", token.clone()))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["deleted"], true);

    // Idempotent in effect: a second delete finds no room.
    let res = client
        .delete(format!("/rooms/{hash}"))
        .header(Header::new("X-Delete-Token", token))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "ROOM_ERROR");
}

#[test]
fn probe_symmetry_never_existed_vs_just_deleted() {
    let client = test_client();
    let (hash, _peer, token) = create_room(&client, "h-exp", 120);
    client
        .delete(format!("/rooms/{hash}"))
        .header(Header::new("X-Delete-Token", token))
        .dispatch();

    let never = client.post("/rooms/h-none/join").dispatch();
    let expired = client.post(format!("/rooms/{hash}/join")).dispatch();
    assert_eq!(never.status(), expired.status());

    let never_body: serde_json::Value = never.into_json().unwrap();
    let expired_body: serde_json::Value = expired.into_json().unwrap();
    assert_eq!(never_body["code"], expired_body["code"]);
    assert_eq!(never_body["code"], "ROOM_ERROR");
}
