use std::time::{Duration, Instant};

use chrono::NaiveDate;
use marksix::retry::RetryPolicy;
use marksix::{DateRange, DrawSource, FetchError, HkjcClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PATH: &str = "/marksix/getJSON.aspx";

fn window() -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(1993, 1, 5).unwrap(),
        end: NaiveDate::from_ymd_opt(1993, 4, 5).unwrap(),
    }
}

fn client(server: &MockServer, attempts: u32) -> HkjcClient {
    HkjcClient::new(
        &server.uri(),
        "marksix-test",
        RetryPolicy::immediate(attempts),
        Duration::ZERO,
    )
    .unwrap()
}

#[tokio::test]
async fn parses_entries_for_the_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .and(query_param("sd", "19930105"))
        .and(query_param("ed", "19930405"))
        .and(query_param("sb", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[
                {"id":"93/002","date":"07/01/1993","no":"11+12+13+14+15+16","sno":"17"},
                {"id":"93/001","date":"05/01/1993","no":"23+4+49+1+17+30","sno":8}
            ]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client(&server, 3).fetch_window(&window()).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].id, "93/001");
    assert_eq!(entries[1].date, "05/01/1993");
    assert_eq!(entries[1].no, "23+4+49+1+17+30");
    assert_eq!(entries[1].sno.as_deref(), Some("8"));
}

#[tokio::test]
async fn empty_array_is_a_definitive_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client(&server, 3).fetch_window(&window()).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .fetch_window(&window())
        .await
        .unwrap_err();

    match err {
        FetchError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::HttpStatus { status: 503, .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn recovers_after_a_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let entries = client(&server, 3).fetch_window(&window()).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .fetch_window(&window())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn unreadable_body_is_an_error_not_an_empty_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .fetch_window(&window())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn entry_without_a_date_field_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":"93/001","drawDate":"05/01/1993","no":"1+2+3+4+5+6","sno":"7"}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .fetch_window(&window())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn consecutive_requests_keep_the_minimum_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESULTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(2)
        .mount(&server)
        .await;

    let interval = Duration::from_millis(300);
    let client = HkjcClient::new(
        &server.uri(),
        "marksix-test",
        RetryPolicy::immediate(1),
        interval,
    )
    .unwrap();

    let started = Instant::now();
    client.fetch_window(&window()).await.unwrap();
    client.fetch_window(&window()).await.unwrap();

    assert!(started.elapsed() >= interval);
}
