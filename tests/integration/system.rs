use rocket::http::Status;

use crate::common::test_client;

#[test]
fn health_reports_rooms_and_peers() {
    let client = test_client();
    client
        .post("/rooms")
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"roomHash":"health-room","ttl":120}"#)
        .dispatch();

    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["rooms"].as_u64().unwrap() >= 1);
    assert_eq!(body["peers"]["total"], body["peers"]["ws"].as_u64().unwrap() + body["peers"]["http"].as_u64().unwrap());
    assert!(body["limits"]["roomCapacity"].is_number());
}

#[test]
fn security_headers_present_on_every_response() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(
        res.headers().get_one("X-Content-Type-Options"),
        Some("nosniff")
    );
    assert_eq!(res.headers().get_one("X-Frame-Options"), Some("DENY"));
    assert_eq!(
        res.headers().get_one("Referrer-Policy"),
        Some("no-referrer")
    );
    assert!(res.headers().get_one("Strict-Transport-Security").is_some());
}

#[test]
fn unknown_route_yields_generic_not_found() {
    let client = test_client();
    let res = client.get("/nonexistent-route").dispatch();
    assert_eq!(res.status(), Status::NotFound);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "ROOM_ERROR");
}
