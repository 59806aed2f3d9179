#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use vaultline_client::{Options, ReqwestTransport, Vault, VaultError};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vault_for(server: &MockServer) -> Vault {
    let connection = Options::default()
        .with_transport(Arc::new(ReqwestTransport::new().unwrap()))
        .with_address(server.uri())
        .with_token("s.integration");
    Vault::with_defaults(Options::defaults().merge(connection))
}

#[tokio::test]
async fn read_sends_token_and_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/app"))
        .and(header("X-Vault-Token", "s.integration"))
        .and(header("X-Vault-Request", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_duration": 2_764_800,
            "data": { "password": "hunter2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = vault_for(&server)
        .read("/kv/app/", Options::default())
        .await
        .unwrap();
    assert_eq!(resp.data(), Some(&json!({ "password": "hunter2" })));
}

#[tokio::test]
async fn list_uses_list_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv"))
        .and(query_param("list", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": ["app", "db/"] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = vault_for(&server)
        .list("kv", Options::default())
        .await
        .unwrap();
    assert_eq!(resp.body["data"]["keys"], json!(["app", "db/"]));
}

#[tokio::test]
async fn kv2_write_wraps_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/secret/data/app"))
        .and(body_json(json!({ "data": { "user": "admin" } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "version": 1 } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = vault_for(&server)
        .write(
            "secret/app",
            json!({ "user": "admin" }),
            Options::default().with_engine("kv2"),
        )
        .await
        .unwrap();
    assert_eq!(resp.body["data"]["version"], json!(1));
}

#[tokio::test]
async fn delete_with_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/kv/app"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let resp = vault_for(&server)
        .delete("kv/app", Options::default())
        .await
        .unwrap();
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_null());
}

#[tokio::test]
async fn server_errors_pass_through_as_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
        .mount(&server)
        .await;

    let err = vault_for(&server)
        .read("kv/missing", Options::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, VaultError::Api { status: 404, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn invalid_config_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = vault_for(&server)
        .help("kv/app", Options::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_config(), "got {err:?}");
}
