// crates/toolgate-mcp/tests/gateway.rs
// ============================================================================
// Module: Gateway Integration Tests
// Description: End-to-end tests over the served gateway and a stub backend.
// Purpose: Ensure signed round trips, gate rejections, and forwarding work.
// Dependencies: reqwest, serde_json, tiny_http, tokio, toolgate-mcp
// ============================================================================

//! ## Overview
//! These tests serve the gateway on a loopback port, stand up a tiny_http
//! stub backend that verifies the outbound signature, and drive the full
//! exchange with signed client requests: handshake, liveness, listing,
//! invocation, and the three gate rejection paths.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use serde_json::json;
use toolgate_mcp::McpGateway;
use toolgate_mcp::NoopAuditSink;
use toolgate_mcp::config::ToolgateConfig;
use toolgate_mcp::session::STATUS_COMMON_PARAMS_EMPTY;
use toolgate_mcp::session::STATUS_SIGNATURE_ERROR;
use toolgate_mcp::session::STATUS_USER_NOT_FOUND;
use toolgate_mcp::signing::PARAM_ACCESS_KEY_ID;
use toolgate_mcp::signing::PARAM_SIGNATURE;
use toolgate_mcp::signing::PARAM_SIGNATURE_METHOD;
use toolgate_mcp::signing::PARAM_SIGNATURE_NONCE;
use toolgate_mcp::signing::SIGNATURE_METHOD;
use toolgate_mcp::signing::compose_string_to_sign;
use toolgate_mcp::signing::sign_string;
use toolgate_mcp::signing::signatures_match;

/// Shared access key for the test identity.
const ACCESS_KEY: &str = "ak-test";
/// Shared secret for the test identity.
const SECRET_KEY: &str = "sk-test";

// ============================================================================
// SECTION: Test Harness
// ============================================================================

/// Running gateway handle; the runtime must outlive the test.
struct RunningGateway {
    /// Address the gateway listens on.
    addr: SocketAddr,
    /// Runtime driving the server task.
    _runtime: tokio::runtime::Runtime,
}

/// Builds the test configuration with one echo tool and one identity.
fn test_config() -> ToolgateConfig {
    let text = format!(
        r#"
        [server]
        bind = "127.0.0.1:8111"

        [gateway]
        mcp_path = "/mcp"
        protected_prefix = "/mcp"
        openapi_timeout_secs = 5

        [[identities]]
        access_key = "{ACCESS_KEY}"
        secret_key = "{SECRET_KEY}"

        [identities.attributes]
        tenant = "blue"

        [[tools]]
        name = "echo"
        method_id = "echoMessage"
        label = "tool.echo"
        base_path = "/api"
        path = "echo"

        [messages]
        "tool.echo" = "Echo the request body"
        "#
    );
    toml::from_str(&text).unwrap()
}

/// Serves the gateway on a loopback port.
fn start_gateway(config: &ToolgateConfig) -> RunningGateway {
    let provider = Arc::new(config.identity_provider());
    let gateway =
        McpGateway::from_config(config, provider, Arc::new(NoopAuditSink)).unwrap();
    let app = gateway.into_router();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let listener =
        runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();
    runtime.spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    RunningGateway {
        addr,
        _runtime: runtime,
    }
}

/// Starts a stub backend that verifies the forwarded signature and echoes
/// the request body with a `backend:` prefix.
fn start_backend() -> SocketAddr {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let verified = verify_forwarded_signature(request.url());
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let (status, payload) = if verified {
                (200, format!("backend:{body}"))
            } else {
                (401, "bad-signature".to_string())
            };
            let response = tiny_http::Response::from_string(payload)
                .with_status_code(tiny_http::StatusCode(status));
            let _ = request.respond(response);
        }
    });
    addr
}

/// Recomputes the forwarded signature from the request query string.
fn verify_forwarded_signature(url: &str) -> bool {
    let Some(query) = url.split_once('?').map(|(_, query)| query) else {
        return false;
    };
    let mut params: BTreeMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let Some(supplied) = params.remove(PARAM_SIGNATURE) else {
        return false;
    };
    let expected =
        sign_string(&compose_string_to_sign(&params), SECRET_KEY).unwrap_or_default();
    signatures_match(&supplied, &expected)
}

/// Builds a signed query string for the given access key and secret.
fn signed_query(access_key: &str, secret: &str) -> String {
    let mut params = BTreeMap::new();
    params.insert(PARAM_SIGNATURE_METHOD.to_string(), SIGNATURE_METHOD.to_string());
    params.insert(PARAM_SIGNATURE_NONCE.to_string(), "test-nonce-1".to_string());
    params.insert(PARAM_ACCESS_KEY_ID.to_string(), access_key.to_string());
    let signature = sign_string(&compose_string_to_sign(&params), secret).unwrap();
    params.insert(PARAM_SIGNATURE.to_string(), signature);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Posts a protocol request to the gateway, steering forwarding at the
/// given backend host via the Host header.
fn post_mcp(
    gateway: SocketAddr,
    query: &str,
    backend_host: &str,
    body: Value,
) -> reqwest::blocking::Response {
    let url = format!("http://{gateway}/mcp?{query}");
    reqwest::blocking::Client::new()
        .post(url)
        .header(reqwest::header::HOST, backend_host)
        .json(&body)
        .send()
        .unwrap()
}

// ============================================================================
// SECTION: End-To-End Exchange
// ============================================================================

#[test]
fn signed_round_trip_serves_the_full_protocol() {
    let backend = start_backend();
    let backend_host = backend.to_string();
    let config = test_config();
    let gateway = start_gateway(&config);
    let query = signed_query(ACCESS_KEY, SECRET_KEY);

    // Handshake.
    let response = post_mcp(
        gateway.addr,
        &query,
        &backend_host,
        json!({"id": 1, "method": "initialize"}),
    );
    assert_eq!(response.status().as_u16(), 200);
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["id"], json!("1"));
    assert_eq!(payload["result"]["protocolVersion"], json!("2025-06-18"));
    assert_eq!(payload["result"]["capabilities"]["tools"]["listChanged"], json!(true));

    // Liveness.
    let response =
        post_mcp(gateway.addr, &query, &backend_host, json!({"id": 2, "method": "ping"}));
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["result"], json!({"ok": true}));

    // Listing: one tool, null schema, no cursor key.
    let response =
        post_mcp(gateway.addr, &query, &backend_host, json!({"id": 3, "method": "tools/list"}));
    let text = response.text().unwrap();
    assert!(!text.contains("nextCursor"));
    let payload: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(payload["result"]["tools"], json!([{
        "name": "echo",
        "description": "Echo the request body",
        "inputSchema": null,
    }]));

    // Invocation: the stub backend verifies the outbound signature and
    // echoes the serialized arguments.
    let response = post_mcp(
        gateway.addr,
        &query,
        &backend_host,
        json!({"id": 4, "method": "tools/call", "params": {"name": "echo", "arguments": {"message": "hi"}}}),
    );
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["id"], json!("4"));
    assert_eq!(payload["result"]["content"], json!([{
        "type": "text",
        "text": "backend:{\"message\":\"hi\"}",
    }]));
}

#[test]
fn unknown_methods_and_tools_fail_with_protocol_errors() {
    let backend = start_backend();
    let backend_host = backend.to_string();
    let config = test_config();
    let gateway = start_gateway(&config);
    let query = signed_query(ACCESS_KEY, SECRET_KEY);

    let response = post_mcp(
        gateway.addr,
        &query,
        &backend_host,
        json!({"id": 5, "method": "tools/watch"}),
    );
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["error"]["code"], json!(-32601));

    let response = post_mcp(
        gateway.addr,
        &query,
        &backend_host,
        json!({"id": 6, "method": "tools/call", "params": {"name": "missing", "arguments": {}}}),
    );
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["error"]["code"], json!(-32603));
    assert_eq!(payload["id"], json!("6"));
}

// ============================================================================
// SECTION: Gate Rejections
// ============================================================================

#[test]
fn gate_rejections_answer_with_bare_statuses_and_empty_bodies() {
    let config = test_config();
    let gateway = start_gateway(&config);
    let host = gateway.addr.to_string();

    // Missing signature parameters.
    let response = post_mcp(gateway.addr, "", &host, json!({"id": 1, "method": "ping"}));
    assert_eq!(response.status().as_u16(), STATUS_COMMON_PARAMS_EMPTY);
    assert_eq!(response.text().unwrap(), "{}");

    // Unknown access key.
    let query = signed_query("ak-unknown", SECRET_KEY);
    let response = post_mcp(gateway.addr, &query, &host, json!({"id": 2, "method": "ping"}));
    assert_eq!(response.status().as_u16(), STATUS_USER_NOT_FOUND);
    assert_eq!(response.text().unwrap(), "{}");

    // Wrong signature.
    let query = signed_query(ACCESS_KEY, "sk-wrong");
    let response = post_mcp(gateway.addr, &query, &host, json!({"id": 3, "method": "ping"}));
    assert_eq!(response.status().as_u16(), STATUS_SIGNATURE_ERROR);
    assert_eq!(response.text().unwrap(), "{}");
}

#[test]
fn signed_params_are_accepted_from_headers() {
    let config = test_config();
    let gateway = start_gateway(&config);
    let host = gateway.addr.to_string();

    let mut params = BTreeMap::new();
    params.insert(PARAM_SIGNATURE_METHOD.to_string(), SIGNATURE_METHOD.to_string());
    params.insert(PARAM_SIGNATURE_NONCE.to_string(), "test-nonce-2".to_string());
    params.insert(PARAM_ACCESS_KEY_ID.to_string(), ACCESS_KEY.to_string());
    let signature =
        sign_string(&compose_string_to_sign(&params), SECRET_KEY).unwrap();

    let url = format!("http://{}/mcp", gateway.addr);
    let response = reqwest::blocking::Client::new()
        .post(url)
        .header(reqwest::header::HOST, host)
        .header(PARAM_ACCESS_KEY_ID, ACCESS_KEY)
        .header(PARAM_SIGNATURE, signature)
        .header(PARAM_SIGNATURE_METHOD, SIGNATURE_METHOD)
        .header(PARAM_SIGNATURE_NONCE, "test-nonce-2")
        .json(&json!({"id": 7, "method": "ping"}))
        .send()
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let payload: Value = response.json().unwrap();
    assert_eq!(payload["result"], json!({"ok": true}));
}
