//! Backend HTTP integration tests
//!
//! Exercises the reqwest-backed cache, generator and job source against a
//! `wiremock` server, plus the full resolver flow over HTTP.

mod common;

use chrono::NaiveDate;
use common::{local, utc};
use serde_json::json;
use wiremock::matchers::{body_json, header, headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reprolab::backend::{
    BackendClient, RemoteJobStatusSource, RemoteSummaryCache, RemoteSummaryGenerator,
};
use reprolab::config::BackendConfig;
use reprolab::error::ReprolabError;
use reprolab::jobs::{JobId, JobStatus, JobStatusSource};
use reprolab::summary::{
    DailySummaryCacheEntry, DailySummaryResolver, GeneratorPayload, SummaryCache, SummaryContext,
    SummaryGenerator, SummaryKey, SummaryRequest,
};

const SUMMARY_TABLE: &str = "daily_summaries";
const SUMMARY_FUNCTION: &str = "daily-summary";
const JOB_TABLE: &str = "embryo_analysis_queue";

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(&BackendConfig {
        url: server.uri(),
        api_key: "anon-key".to_string(),
        request_timeout_seconds: 5,
    })
    .expect("client builds")
}

fn key() -> SummaryKey {
    SummaryKey::new("C1", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
}

fn payload() -> GeneratorPayload {
    GeneratorPayload {
        client_id: "C1".to_string(),
        client_name: "Fazenda Boa Vista".to_string(),
        date: "2024-05-01".to_string(),
        time: "08:00".to_string(),
        context: SummaryContext::default(),
    }
}

fn backend_kind(err: &anyhow::Error) -> Option<&ReprolabError> {
    err.downcast_ref::<ReprolabError>()
}

// ---------------------------------------------------------------------------
// Summary cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cache_get_returns_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_summaries"))
        .and(query_param("client_id", "eq.C1"))
        .and(query_param("summary_date", "eq.2024-05-01"))
        .and(query_param("select", "summary,generated_at"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"summary": "All good", "generated_at": "2024-05-01T08:00:00+00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RemoteSummaryCache::new(client(&server), SUMMARY_TABLE);
    let entry = cache.get(&key()).await.unwrap();

    assert_eq!(
        entry,
        Some(DailySummaryCacheEntry {
            summary: "All good".to_string(),
            generated_at: utc(2024, 5, 1, 8, 0),
        })
    );
}

#[tokio::test]
async fn test_cache_get_empty_array_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let cache = RemoteSummaryCache::new(client(&server), SUMMARY_TABLE);
    assert_eq!(cache.get(&key()).await.unwrap(), None);
}

#[tokio::test]
async fn test_cache_get_server_error_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_summaries"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let cache = RemoteSummaryCache::new(client(&server), SUMMARY_TABLE);
    let err = cache.get(&key()).await.unwrap_err();

    match backend_kind(&err) {
        Some(ReprolabError::Backend { status, message }) => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cache_put_upserts_on_conflict_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/daily_summaries"))
        .and(query_param("on_conflict", "client_id,summary_date"))
        .and(headers(
            "prefer",
            vec!["resolution=merge-duplicates", "return=minimal"],
        ))
        .and(body_json(json!([{
            "client_id": "C1",
            "summary_date": "2024-05-01",
            "summary": "All good",
            "generated_at": "2024-05-01T08:00:00Z"
        }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RemoteSummaryCache::new(client(&server), SUMMARY_TABLE);
    cache
        .put(
            &key(),
            &DailySummaryCacheEntry {
                summary: "All good".to_string(),
                generated_at: utc(2024, 5, 1, 8, 0),
            },
        )
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Summary generator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_generator_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/daily-summary"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "summary": "All good",
            "generated_at": "2024-05-01T08:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = RemoteSummaryGenerator::new(client(&server), SUMMARY_FUNCTION);
    let entry = generator.generate(&payload()).await.unwrap();

    assert_eq!(entry.summary, "All good");
    assert_eq!(entry.generated_at, utc(2024, 5, 1, 8, 0));

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["cliente_id"], "C1");
    assert_eq!(body["cliente_nome"], "Fazenda Boa Vista");
    assert_eq!(body["data"], "2024-05-01");
    assert_eq!(body["hora"], "08:00");
    for field in [
        "receptoras",
        "proximos_servicos",
        "ultimos_resultados",
        "estoque",
        "fazendas",
    ] {
        assert!(body.get(field).is_some(), "missing {}", field);
    }
}

#[tokio::test]
async fn test_generator_application_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/daily-summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "OpenAI quota exceeded"
        })))
        .mount(&server)
        .await;

    let generator = RemoteSummaryGenerator::new(client(&server), SUMMARY_FUNCTION);
    let err = generator.generate(&payload()).await.unwrap_err();
    assert!(matches!(
        backend_kind(&err),
        Some(ReprolabError::Generation(msg)) if msg == "OpenAI quota exceeded"
    ));
}

#[tokio::test]
async fn test_generator_transport_failure_is_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/daily-summary"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let generator = RemoteSummaryGenerator::new(client(&server), SUMMARY_FUNCTION);
    let err = generator.generate(&payload()).await.unwrap_err();
    assert!(matches!(
        backend_kind(&err),
        Some(ReprolabError::Backend { status: 500, .. })
    ));
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_job_status_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/embryo_analysis_queue"))
        .and(query_param("id", "eq.J1"))
        .and(query_param("select", "status,started_at,completed_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "status": "running",
            "started_at": "2024-05-01T08:00:00+00:00",
            "completed_at": null
        }])))
        .mount(&server)
        .await;

    let source = RemoteJobStatusSource::new(client(&server), JOB_TABLE);
    let record = source.fetch_status(&JobId::from("J1")).await.unwrap();

    assert_eq!(record.status, JobStatus::Running);
    assert_eq!(record.started_at, Some(utc(2024, 5, 1, 8, 0)));
    assert_eq!(record.completed_at, None);
}

#[tokio::test]
async fn test_job_status_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/embryo_analysis_queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let source = RemoteJobStatusSource::new(client(&server), JOB_TABLE);
    let err = source.fetch_status(&JobId::from("ghost")).await.unwrap_err();
    assert!(matches!(backend_kind(&err), Some(ReprolabError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// Resolver over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resolver_miss_over_http_generates_and_upserts_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/daily-summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "summary": "All good",
            "generated_at": "2024-05-01T08:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/daily_summaries"))
        .and(query_param("on_conflict", "client_id,summary_date"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let resolver = DailySummaryResolver::new(
        RemoteSummaryCache::new(backend.clone(), SUMMARY_TABLE),
        RemoteSummaryGenerator::new(backend, SUMMARY_FUNCTION),
    );

    let result = resolver
        .resolve_at(
            &SummaryRequest::new("C1", "Fazenda Boa Vista"),
            local(2024, 5, 1, 5, 0),
        )
        .await
        .unwrap();
    assert_eq!(result.summary, "All good");
    assert!(!result.from_cache);

    let received = server.received_requests().await.unwrap();
    let order: Vec<String> = received
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        order,
        vec![
            "GET /rest/v1/daily_summaries",
            "POST /functions/v1/daily-summary",
            "POST /rest/v1/daily_summaries",
        ]
    );
}

#[tokio::test]
async fn test_resolver_hit_over_http_never_calls_generator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"summary": "All good", "generated_at": "2024-05-01T08:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let backend = client(&server);
    let resolver = DailySummaryResolver::new(
        RemoteSummaryCache::new(backend.clone(), SUMMARY_TABLE),
        RemoteSummaryGenerator::new(backend, SUMMARY_FUNCTION),
    );

    let result = resolver
        .resolve_at(
            &SummaryRequest::new("C1", "Fazenda Boa Vista"),
            local(2024, 5, 1, 14, 0),
        )
        .await
        .unwrap();
    assert!(result.from_cache);
    assert_eq!(result.summary, "All good");
}
