use std::time::Duration;

use gqlfix::{
    WebhookServer, ACTIONS_WEBHOOK_PORT, EVENTS_WEBHOOK_PORT, SCHEDULED_EVENTS_WEBHOOK_PORT,
};
use serde_json::json;

#[tokio::test]
async fn test_stopped_webhook_frees_its_port() {
    let first = WebhookServer::start(EVENTS_WEBHOOK_PORT).await.unwrap();
    // Zero requests delivered; stop must still release the socket.
    first.stop().await;

    let second = WebhookServer::start(EVENTS_WEBHOOK_PORT)
        .await
        .expect("port must be free immediately after stop");
    assert_eq!(second.addr().port(), EVENTS_WEBHOOK_PORT);
    second.stop().await;
}

#[tokio::test]
async fn test_webhook_records_deliveries_from_the_engine() {
    let server = WebhookServer::start(ACTIONS_WEBHOOK_PORT).await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/actions/create_user", server.url()))
        .json(&json!({ "input": { "name": "alice" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let requests = server.drain();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/actions/create_user");
    assert_eq!(requests[0].body["input"]["name"], "alice");
    server.stop().await;
}

#[tokio::test]
async fn test_next_request_waits_for_a_delivery() {
    let server = WebhookServer::start(SCHEDULED_EVENTS_WEBHOOK_PORT)
        .await
        .unwrap();
    let url = server.url();

    let sender = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        reqwest::Client::new()
            .post(format!("{url}/scheduled"))
            .json(&json!({ "id": "cron-1" }))
            .send()
            .await
            .unwrap();
    });

    let request = server
        .next_request(Duration::from_secs(2))
        .await
        .expect("delivery must arrive within the timeout");
    assert_eq!(request.body["id"], "cron-1");

    sender.await.unwrap();
    server.stop().await;
}
