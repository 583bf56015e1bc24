//! Integration tests for PageKit using wiremock

use pagekit::{extract, fetch, fetch_with_options, FetchError, FetchOptions};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_HTML: &str = include_str!("fixtures/article.html");
const ARTICLE_TEXT: &str = include_str!("fixtures/article.txt");

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pagekit=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_golden_extraction() {
    let doc = extract(ARTICLE_HTML.bytes());

    assert_eq!(doc.text, ARTICLE_TEXT.trim_end());
    assert_eq!(doc.meta.title, "Rust & Friends");
    assert_eq!(doc.meta.description, "Rust, the language.");
    assert_eq!(doc.meta.status_code, 200);
    assert_eq!(doc.url, "");
}

#[tokio::test]
async fn test_fetch_html_page() {
    init_logging();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE_HTML, "text/html"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/article", mock_server.uri());
    let doc = fetch(&url).await.unwrap();

    assert_eq!(doc.url, url);
    assert_eq!(doc.meta.status_code, 200);
    assert_eq!(doc.meta.title, "Rust & Friends");
    assert_eq!(doc.meta.description, "Rust, the language.");
    assert_eq!(doc.text, ARTICLE_TEXT.trim_end());
    assert!(chrono::DateTime::parse_from_rfc3339(&doc.meta.timestamp).is_ok());
}

#[tokio::test]
async fn test_large_body_extracted_across_chunks() {
    let mock_server = MockServer::start().await;
    let body = format!("<title>Big</title>{}", "<p>word</p>".repeat(50_000));

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(&mock_server)
        .await;

    let doc = fetch(&format!("{}/big", mock_server.uri())).await.unwrap();

    assert_eq!(doc.meta.title, "Big");
    assert_eq!(doc.text.split(' ').count(), 50_000);
    assert!(doc.text.split(' ').all(|w| w == "word"));
}

#[tokio::test]
async fn test_404_is_unexpected_status() {
    init_logging();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let result = fetch(&format!("{}/missing", mock_server.uri())).await;

    match result {
        Err(FetchError::UnexpectedStatus { code }) => assert_eq!(code, 404),
        other => panic!("expected UnexpectedStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_5xx_is_unexpected_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let err = fetch(&format!("{}/error", mock_server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.to_string(), "Unexpected status code 500");
}

#[tokio::test]
async fn test_non_200_success_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let err = fetch(&format!("{}/", mock_server.uri())).await.unwrap_err();
    assert_eq!(err.status_code(), Some(204));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>late</p>", "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let options = FetchOptions {
        timeout: Duration::from_millis(500),
        ..Default::default()
    };

    let started = Instant::now();
    let err = fetch_with_options(&format!("{}/slow", mock_server.uri()), &options)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
    assert!(err.is_timeout());
    assert!(
        elapsed < options.timeout + Duration::from_secs(2),
        "took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_unreachable_address_is_transport_error() {
    // Bind and release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let started = Instant::now();
    let err = fetch(&format!("http://127.0.0.1:{}/", port))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
    assert!(started.elapsed() < pagekit::DEFAULT_TIMEOUT + Duration::from_secs(2));
}

#[tokio::test]
async fn test_default_user_agent_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", pagekit::DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .mount(&mock_server)
        .await;

    let doc = fetch(&format!("{}/", mock_server.uri())).await.unwrap();
    assert_eq!(doc.text, "ok");
}

#[tokio::test]
async fn test_custom_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "CustomBot/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .mount(&mock_server)
        .await;

    let options = FetchOptions {
        user_agent: Some("CustomBot/1.0".to_string()),
        ..Default::default()
    };
    let doc = fetch_with_options(&format!("{}/", mock_server.uri()), &options)
        .await
        .unwrap();

    assert_eq!(doc.meta.status_code, 200);
    assert_eq!(doc.text, "ok");
}

#[tokio::test]
async fn test_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let doc = fetch(&format!("{}/", mock_server.uri())).await.unwrap();

    assert_eq!(doc.text, "");
    assert_eq!(doc.meta.title, "");
    assert_eq!(doc.meta.status_code, 200);
}

#[tokio::test]
async fn test_non_html_body_is_extracted_as_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Just   Plain\n\nText")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&mock_server)
        .await;

    let doc = fetch(&format!("{}/plain", mock_server.uri())).await.unwrap();
    assert_eq!(doc.text, "just plain text");
}

#[tokio::test]
async fn test_document_json_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<title>JSON</title><meta name="description" content="d"><p>Body</p>"#,
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    let doc = fetch(&format!("{}/", mock_server.uri())).await.unwrap();
    let json = serde_json::to_value(&doc).unwrap();

    assert_eq!(json["text"], "body");
    assert_eq!(json["metadata"]["title"], "JSON");
    assert_eq!(json["metadata"]["description"], "d");
    assert_eq!(json["metadata"]["status_code"], 200);
}

#[tokio::test]
async fn test_invalid_url_rejected_before_request() {
    let err = fetch("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl));

    let err = fetch("").await.unwrap_err();
    assert!(err.to_string().contains("Missing"));
}
