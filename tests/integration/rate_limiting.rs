use rocket::http::{ContentType, Status};

use crate::common::{base_config, test_client_with_config};

fn config_with_create_limit(limit: u32) -> ghostrelay::config::RelayConfig {
    let mut config = base_config();
    config.rate_limit_creates = limit;
    config
}

#[test]
fn sixth_create_within_window_is_rate_limited() {
    let client = test_client_with_config(config_with_create_limit(5));

    for i in 0..5 {
        let res = client
            .post("/rooms")
            .header(ContentType::JSON)
            .body(format!(r#"{{"roomHash":"rl-{i}","ttl":120}}"#))
            .dispatch();
        assert_eq!(res.status(), Status::Created);
    }

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .body(r#"{"roomHash":"rl-6","ttl":120}"#)
        .dispatch();
    assert_eq!(res.status(), Status::TooManyRequests);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    // And the room was not created.
    let res = client.post("/rooms/rl-6/join").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn join_and_create_counters_are_independent() {
    let mut config = base_config();
    config.rate_limit_creates = 1;
    config.rate_limit_joins = 5;
    let client = test_client_with_config(config);

    let res = client
        .post("/rooms")
        .header(ContentType::JSON)
        .body(r#"{"roomHash":"indep","ttl":120}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);

    // Creates are now exhausted, but joins still have headroom.
    let res = client.post("/rooms/indep/join").dispatch();
    assert_eq!(res.status(), Status::Ok);
}
