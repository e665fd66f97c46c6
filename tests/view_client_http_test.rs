//! Wire-level tests for the HTTP view client against a mock node

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use curve_buyer::view_client::fetch_round;
use curve_buyer::{
    Config, HttpViewClient, PurchaseCoordinator, QuoteState, RoundOutcome, SimulatedWallet,
    ViewClient, ViewError,
};

fn config_for(server_url: &str) -> Config {
    let mut config = Config::default();
    config.node.url = format!("{}/v1", server_url);
    config.node.timeout_secs = 5;
    config.contract.address = "0xcurve".to_string();
    config
}

#[tokio::test]
async fn test_query_view_posts_expected_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/view")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "function": "0xcurve::BondingCurve::get_token_price",
            "type_arguments": [],
            "arguments": ["0xcurve", "PROMPT"],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["10"]"#)
        .create_async()
        .await;

    let client = HttpViewClient::new(&format!("{}/v1", server.url()), Duration::from_secs(5)).unwrap();
    let values = client
        .query_view(
            "0xcurve::BondingCurve::get_token_price",
            vec![json!("0xcurve"), json!("PROMPT")],
        )
        .await
        .unwrap();

    assert_eq!(values, vec![json!("10")]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/view")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let client = HttpViewClient::new(&format!("{}/v1", server.url()), Duration::from_secs(5)).unwrap();
    let err = client
        .query_view("0xcurve::BondingCurve::get_token_supply", vec![])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(matches!(err, ViewError::Network { .. }));
}

#[tokio::test]
async fn test_fetch_round_over_http() {
    let mut server = mockito::Server::new_async().await;
    let _price = server
        .mock("POST", "/v1/view")
        .match_body(Matcher::PartialJson(json!({
            "function": "0xcurve::BondingCurve::get_token_price"
        })))
        .with_status(200)
        .with_body(r#"["10"]"#)
        .create_async()
        .await;
    let _supply = server
        .mock("POST", "/v1/view")
        .match_body(Matcher::PartialJson(json!({
            "function": "0xcurve::BondingCurve::get_token_supply"
        })))
        .with_status(200)
        .with_body("[100]")
        .create_async()
        .await;

    let config = config_for(&server.url());
    let client = HttpViewClient::from_config(&config).unwrap();
    let observation = fetch_round(&client, &config.contract).await.unwrap();

    assert_eq!(observation.base_price, 10.0);
    assert_eq!(observation.supply, 100);
}

#[tokio::test]
async fn test_http_500_leaves_quote_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/view")
        .with_status(500)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let client: Arc<dyn ViewClient> = Arc::new(HttpViewClient::from_config(&config).unwrap());
    let coordinator = PurchaseCoordinator::new(client, Arc::new(SimulatedWallet::connected("0xa")), &config);

    assert_eq!(coordinator.set_quantity(2).await, RoundOutcome::Unavailable);
    assert_eq!(coordinator.quote(), QuoteState::unavailable());
    assert!(coordinator.outcome().error_message.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/view")
        .with_status(200)
        .with_body(r#"{"not":"a list"}"#)
        .create_async()
        .await;

    let client = HttpViewClient::new(&format!("{}/v1", server.url()), Duration::from_secs(5)).unwrap();
    let err = client.query_view("f", vec![]).await.unwrap_err();
    assert!(matches!(err, ViewError::Decode { .. }));
}
