//! HTTP Route Tests
//!
//! Exercises the warp filters in-process with `warp::test::request()`.

mod common;

use std::sync::Arc;

use common::{b64, unb64, TestAgent};
use serde_json::Value;
use signing_gateway::{
    build_routes, DigestAlgorithm, GatewayConfiguration, GatewayState, InMemorySessionStore,
    LocalCryptoEngine,
};
use warp::http::StatusCode;
use warp::{Filter, Reply};

fn routes() -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    let config = GatewayConfiguration {
        nexu_url: "http://localhost:9795".to_string(),
        download_nexu_url: "https://example.test/nexu".to_string(),
        ..GatewayConfiguration::default()
    };
    let state = GatewayState::new(
        &config,
        Arc::new(LocalCryptoEngine::new()),
        Arc::new(InMemorySessionStore::default()),
    );
    build_routes(Arc::new(state))
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("JSON body")
}

/// Percent-encode the characters base64 and names may carry.
fn form_encode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            let v: String = v
                .chars()
                .map(|c| match c {
                    '+' => "%2B".to_string(),
                    '/' => "%2F".to_string(),
                    '=' => "%3D".to_string(),
                    '&' => "%26".to_string(),
                    ' ' => "+".to_string(),
                    c => c.to_string(),
                })
                .collect();
            format!("{k}={v}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn session_cookie(response: &warp::http::Response<bytes::Bytes>) -> String {
    let header = response.headers()["set-cookie"].to_str().unwrap();
    assert!(header.contains("HttpOnly"));
    header.split(';').next().unwrap().to_string()
}

fn digest_body(digest: &[u8]) -> String {
    form_encode(&[
        ("signatureForm", "CAdES"),
        ("signatureLevel", "XAdES-BASELINE-B"),
        ("digestAlgorithm", "SHA256"),
        ("documentName", "contract.pdf"),
        ("digestToSign", &b64(digest)),
    ])
}

async fn configure_digest<F>(filter: &F) -> String
where
    F: Filter + Clone + 'static,
    F::Extract: Reply + Send,
{
    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(digest_body(&DigestAlgorithm::Sha256.digest(b"contract")))
        .reply(filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = json(response.body());
    assert_eq!(view["rootUrl"], "sign-a-digest");
    assert_eq!(view["nexuUrl"], "http://localhost:9795");
    assert_eq!(view["digestAlgorithm"], "SHA256");
    session_cookie(&response)
}

#[tokio::test]
async fn test_show_form_models() {
    let filter = routes();

    let response = warp::test::request()
        .method("GET")
        .path("/sign-a-digest")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let model = json(response.body());
    assert_eq!(model["defaultDigestAlgorithm"], "SHA256");
    assert_eq!(model["downloadNexuUrl"], "https://example.test/nexu");
    assert_eq!(model["isMockUsed"], true);
    assert!(model.get("asicContainerTypes").is_none());

    let response = warp::test::request()
        .method("GET")
        .path("/sign-multiple-documents")
        .reply(&filter)
        .await;
    let model = json(response.body());
    assert_eq!(model["asicContainerTypes"], serde_json::json!(["ASiC-S", "ASiC-E"]));
    assert!(model["digestAlgos"]
        .as_array()
        .unwrap()
        .contains(&Value::from("SHA224")));
}

#[tokio::test]
async fn test_full_digest_workflow_over_http() {
    let filter = routes();
    let agent = TestAgent::rsa("HTTP Signer");
    let cookie = configure_digest(&filter).await;

    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest/get-data-to-sign")
        .header("cookie", &cookie)
        .json(&agent.data_to_sign_params(&[]))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data_to_sign = json(response.body())["dataToSign"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(unb64(&data_to_sign).len(), 32);

    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest/sign-document")
        .header("cookie", &cookie)
        .json(&agent.signature_params(&data_to_sign, DigestAlgorithm::Sha256))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response.body())["urlToDownload"], "download");

    let response = warp::test::request()
        .method("GET")
        .path("/sign-a-digest/download")
        .header("cookie", &cookie)
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"contract.pdf\""
    );
    assert_eq!(headers["content-transfer-encoding"], "binary");
    assert_eq!(json(response.body())["signatureLevel"], "XAdES-BASELINE-B");
}

#[tokio::test]
async fn test_invalid_configuration_redisplays_form() {
    let filter = routes();
    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(form_encode(&[
            ("signatureForm", "PAdES"),
            ("signatureLevel", "CAdES-BASELINE-B"),
            ("digestAlgorithm", "SHA224"),
        ]))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("set-cookie").is_none());
    let model = json(response.body());
    assert!(!model["errors"].as_array().unwrap().is_empty());
    assert_eq!(model["defaultDigestAlgorithm"], "SHA256");
}

#[tokio::test]
async fn test_out_of_order_and_missing_session_statuses() {
    let filter = routes();

    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest/sign-document")
        .json(&serde_json::json!({ "signatureValue": b64(b"sig") }))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response.body())["errorCode"], "SESSION_NOT_FOUND");

    let cookie = configure_digest(&filter).await;

    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest/sign-document")
        .header("cookie", &cookie)
        .json(&serde_json::json!({ "signatureValue": b64(b"sig") }))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json(response.body())["errorCode"], "OUT_OF_ORDER_REQUEST");

    let response = warp::test::request()
        .method("GET")
        .path("/sign-a-digest/download")
        .header("cookie", &cookie)
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response.body())["errorCode"], "DOWNLOAD_NOT_READY");

    // The digest session is invisible to the multi-document routes.
    let response = warp::test::request()
        .method("GET")
        .path("/sign-multiple-documents/download")
        .header("cookie", &cookie)
        .reply(&filter)
        .await;
    assert_eq!(json(response.body())["errorCode"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_json_and_unknown_route() {
    let filter = routes();
    let cookie = configure_digest(&filter).await;

    let response = warp::test::request()
        .method("POST")
        .path("/sign-a-digest/get-data-to-sign")
        .header("cookie", &cookie)
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response.body())["errorCode"], "BAD_REQUEST");

    let response = warp::test::request()
        .method("GET")
        .path("/nowhere")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response.body())["errorCode"], "NOT_FOUND");
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"documentsToSign\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn test_multipart_container_workflow() {
    let filter = routes();
    let agent = TestAgent::ecdsa("Container Signer");
    let boundary = "gateway-test-boundary";

    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(
            boundary,
            &[
                ("signatureForm", "XAdES"),
                ("signatureLevel", "XAdES-BASELINE-B"),
                ("digestAlgorithm", "SHA256"),
                ("containerType", "ASiC-S"),
            ],
            &[("notes.txt", b"meeting notes")],
        ))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK, "{:?}", response.body());
    let cookie = session_cookie(&response);

    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents/get-data-to-sign")
        .header("cookie", &cookie)
        .json(&agent.data_to_sign_params(&[]))
        .reply(&filter)
        .await;
    let data_to_sign = json(response.body())["dataToSign"]
        .as_str()
        .unwrap()
        .to_string();

    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents/sign-document")
        .header("cookie", &cookie)
        .json(&agent.signature_params(&data_to_sign, DigestAlgorithm::Sha256))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = warp::test::request()
        .method("GET")
        .path("/sign-multiple-documents/download")
        .header("cookie", &cookie)
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/vnd.etsi.asic-s+zip"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"notes.asics\""
    );
}

#[tokio::test]
async fn test_multipart_rejects_unknown_container() {
    let filter = routes();
    let boundary = "b0undary";
    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(
            boundary,
            &[
                ("signatureForm", "CAdES"),
                ("signatureLevel", "CAdES-BASELINE-B"),
                ("digestAlgorithm", "SHA256"),
                ("containerType", "ZIP"),
            ],
            &[("a.txt", b"a")],
        ))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let model = json(response.body());
    assert!(model["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m.as_str().unwrap().contains("ZIP")));
}

#[tokio::test]
async fn test_multipart_reads_every_document_part() {
    let filter = routes();
    let boundary = "multi-part-boundary";
    let fields = [
        ("signatureForm", "XAdES"),
        ("signatureLevel", "XAdES-BASELINE-B"),
        ("digestAlgorithm", "SHA512"),
        ("containerType", "ASiC-E"),
    ];

    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(
            boundary,
            &fields,
            &[("a.txt", b"first"), ("b.txt", b"other"), ("c.txt", b"third")],
        ))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK, "{:?}", response.body());
    assert_eq!(json(response.body())["digestAlgorithm"], "SHA512");

    let response = warp::test::request()
        .method("POST")
        .path("/sign-multiple-documents")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(
            boundary,
            &fields,
            &[("a.txt", b"first"), ("a.txt", b"again")],
        ))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let model = json(response.body());
    assert!(model["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m.as_str().unwrap().contains("a.txt")));
    assert!(response.headers().get("set-cookie").is_none());
}
