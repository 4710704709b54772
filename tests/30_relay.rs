mod common;

use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use captain_api::database::{Card, RegistryStore};
use common::{FakeRobot, TestServer};

/// Card `c1` bound to a fake robot, plus a session started for `c1`
async fn bound_robot(server: &TestServer) -> Result<(FakeRobot, String)> {
    let robot = FakeRobot::spawn().await?;
    server.registry.upsert_card(&Card::new("c1", b"call leds.top(32,0,0)".to_vec())).await?;
    server.registry.upsert_robot("r1", &robot.base_url).await?;

    let admin = server.admin_session().await?;
    let res = server.put("/v1/robot/r1/card/c1", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let session = server.card_session("c1").await?;
    Ok((robot, session))
}

#[tokio::test]
async fn ping_is_forwarded_verbatim() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (robot, session) = bound_robot(&server).await?;

    let res = server.get("/v1/card/c1/ping", &session).send().await?;
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(res.text().await?, common::PING_BODY);

    let requests = robot.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/bot/ping");
    Ok(())
}

#[tokio::test]
async fn run_and_stop_pass_status_through() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (robot, session) = bound_robot(&server).await?;

    let res = server.get("/v1/card/c1/run", &session).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "running");

    // a robot-side failure is forwarded, not turned into an error body
    let res = server.get("/v1/card/c1/stop", &session).send().await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await?, "motor stalled");

    let paths: Vec<_> = robot.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/bot/run", "/bot/stop"]);
    Ok(())
}

#[tokio::test]
async fn upload_puts_the_stored_program() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (robot, session) = bound_robot(&server).await?;

    let res = server.get("/v1/card/c1/upload", &session).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.text().await?, "stored");

    let requests = robot.requests();
    assert_eq!(requests.len(), 1);
    let upload = &requests[0];
    assert_eq!(upload.method, Method::PUT);
    assert_eq!(upload.path, "/bot/upload");
    assert_eq!(upload.content_type.as_deref(), Some("application/json; charset=UTF-8"));

    let body: Value = serde_json::from_slice(&upload.body)?;
    assert_eq!(
        body,
        json!({ "cardId": "c1", "program": "Y2FsbCBsZWRzLnRvcCgzMiwwLDAp" })
    );
    Ok(())
}

#[tokio::test]
async fn card_scope_comes_from_the_session() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (robot, _) = bound_robot(&server).await?;
    server.registry.upsert_card(&Card::new("c2", Vec::new())).await?;

    let intruder = server.card_session("c2").await?;
    let admin = server.admin_session().await?;
    for session in [&intruder, &admin] {
        let res = server.get("/v1/card/c1/run", session).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.json::<Value>().await?, json!({ "errorDescription": "Not authorized" }));
    }

    let res = server.client.get(server.url("/v1/card/c1/ping")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert!(robot.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn disassociated_card_has_no_robot() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (robot, session) = bound_robot(&server).await?;

    let admin = server.admin_session().await?;
    let res = server.delete("/v1/robot/r1/card", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get("/v1/card/c1/ping", &session).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "errorDescription": "No robot associated with this card" })
    );
    assert!(robot.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_robot_is_a_gateway_error() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.registry.upsert_card(&Card::new("c1", Vec::new())).await?;
    server.registry.upsert_robot("r1", &common::unreachable_url()).await?;
    let admin = server.admin_session().await?;
    server.put("/v1/robot/r1/card/c1", &admin).send().await?;
    let session = server.card_session("c1").await?;

    let res = server.get("/v1/card/c1/ping", &session).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.json::<Value>().await?, json!({ "errorDescription": "Robot unavailable" }));
    Ok(())
}

#[tokio::test]
async fn hanging_robot_times_out() -> Result<()> {
    let mut config = common::test_config(false);
    config.relay.timeout_ms = 500;
    let server = TestServer::spawn_with(config).await?;

    server.registry.upsert_card(&Card::new("c1", Vec::new())).await?;
    server.registry.upsert_robot("r1", &common::hanging_robot_url().await?).await?;
    let admin = server.admin_session().await?;
    server.put("/v1/robot/r1/card/c1", &admin).send().await?;
    let session = server.card_session("c1").await?;

    let started = Instant::now();
    let res = server.get("/v1/card/c1/ping", &session).send().await?;
    let elapsed = started.elapsed();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.json::<Value>().await?, json!({ "errorDescription": "Robot unavailable" }));
    assert!(elapsed >= Duration::from_millis(400), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "{:?}", elapsed);
    Ok(())
}

#[tokio::test]
async fn admin_pings_robot_by_name() -> Result<()> {
    let server = TestServer::spawn().await?;
    let robot = FakeRobot::spawn().await?;
    server.registry.upsert_robot("r5", &robot.base_url).await?;
    let admin = server.admin_session().await?;

    let res = server.get("/v1/robot/r5/ping", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.text().await?, common::PING_BODY);

    let res = server.get("/v1/robot/ghost/ping", &admin).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
