//! Tests for the Bitrise client and enricher against a mock API.

use buildboard_core::{
    BitriseClient, BuildEnricher, BuildSource, DashboardConfig,
    error::{ApiError, FetchError},
};
use httpmock::prelude::*;
use serde_json::json;

const APP: &str = "app-1";
const TOKEN: &str = "secret-token";

fn config(server: &MockServer) -> DashboardConfig {
    DashboardConfig::new(TOKEN, APP)
        .with_api_base(&server.base_url())
        .with_web_base("https://web.example")
}

fn builds_body() -> serde_json::Value {
    json!({
        "data": [
            {
                "slug": "b-ok",
                "build_number": 101,
                "status_text": "success",
                "branch": "main",
                "commit_message": "Ship it",
                "triggered_at": "2024-03-01T10:00:00Z",
                "triggered_workflow": "deploy"
            },
            {
                "slug": "b-err",
                "build_number": 212,
                "status_text": "error",
                "branch": "dev",
                "commit_message": null,
                "triggered_at": "2024-03-02T10:00:00Z"
            }
        ],
        "paging": { "page_item_limit": 50, "total_item_count": 2 }
    })
}

async fn mock_log<'a>(server: &'a MockServer, slug: &str) -> httpmock::Mock<'a> {
    let path = format!("/apps/{APP}/builds/{slug}/log");
    let url = format!("https://logs.example/{slug}");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).header("authorization", TOKEN);
            then.status(200)
                .json_body(json!({ "expiring_raw_log_url": url, "is_archived": true }));
        })
        .await
}

#[tokio::test]
async fn test_list_builds_sends_token_and_limit() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/apps/{APP}/builds"))
                .header("authorization", TOKEN)
                .query_param("limit", "5");
            then.status(200).json_body(builds_body());
        })
        .await;

    let mut config = config(&server);
    config.page_limit = Some(5);
    let client = BitriseClient::new(&config).unwrap();

    let builds = client.list_builds().await.unwrap();

    list.assert_async().await;
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].slug, "b-ok");
    assert_eq!(builds[0].extra["triggered_workflow"], "deploy");
    assert_eq!(builds[1].commit_message, None);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds"));
            then.status(401).json_body(json!({ "message": "Unauthorized" }));
        })
        .await;

    let client = BitriseClient::new(&config(&server)).unwrap();
    let err = client.list_builds().await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-ok/log"));
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let client = BitriseClient::new(&config(&server)).unwrap();
    let err = client.build_log("b-ok").await.unwrap_err();

    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_enrichment_end_to_end() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds"));
            then.status(200).json_body(builds_body());
        })
        .await;
    mock_log(&server, "b-ok").await;
    mock_log(&server, "b-err").await;

    let artifacts = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-ok/artifacts"));
            then.status(200).json_body(json!({
                "data": [
                    { "slug": "art-log", "title": "build.log", "artifact_meta": null },
                    { "slug": "art-ipa", "title": "App.ipa", "artifact_meta": { "app_info": {} } }
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/apps/{APP}/builds/b-ok/artifacts/art-ipa"));
            then.status(200).json_body(json!({
                "data": {
                    "slug": "art-ipa",
                    "public_install_page_url": "https://install.example/art-ipa",
                    "artifact_meta": { "app_info": { "app_title": "Demo App" } }
                }
            }));
        })
        .await;
    let error_artifacts = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-err/artifacts"));
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;

    let config = config(&server);
    let enricher = BuildEnricher::new(BitriseClient::new(&config).unwrap(), &config);
    let report = enricher.fetch_and_enrich().await.unwrap();

    artifacts.assert_async().await;
    assert_eq!(error_artifacts.hits_async().await, 0);
    assert!(report.partial_failures.is_empty());

    let ok = &report.builds[0];
    assert_eq!(ok.slug, "b-ok");
    assert_eq!(ok.log_url.as_deref(), Some("https://logs.example/b-ok"));
    assert_eq!(ok.build_url, "https://web.example/build/b-ok");
    assert_eq!(
        ok.public_install_page_url.as_deref(),
        Some("https://install.example/art-ipa")
    );
    assert_eq!(
        ok.bitrise_download_page_url.as_deref(),
        Some("https://web.example/app/app-1/installable-artifacts/art-ipa")
    );
    assert_eq!(ok.app_title.as_deref(), Some("Demo App"));

    let err = &report.builds[1];
    assert_eq!(err.slug, "b-err");
    assert!(err.app_title.is_none());
    assert!(err.bitrise_download_page_url.is_none());

    let rendered = serde_json::to_value(ok).unwrap();
    assert_eq!(rendered["triggered_workflow"], "deploy");
    assert_eq!(rendered["app_title"], "Demo App");
}

#[tokio::test]
async fn test_artifact_failure_keeps_build() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds"));
            then.status(200).json_body(builds_body());
        })
        .await;
    mock_log(&server, "b-ok").await;
    mock_log(&server, "b-err").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-ok/artifacts"));
            then.status(503);
        })
        .await;

    let config = config(&server);
    let enricher = BuildEnricher::new(BitriseClient::new(&config).unwrap(), &config);
    let report = enricher.fetch_and_enrich().await.unwrap();

    assert_eq!(report.builds.len(), 2);
    assert_eq!(report.partial_failures.len(), 1);
    assert_eq!(report.partial_failures[0].build_slug, "b-ok");

    let ok = &report.builds[0];
    assert_eq!(ok.log_url.as_deref(), Some("https://logs.example/b-ok"));
    assert!(ok.public_install_page_url.is_none());
    assert!(ok.bitrise_download_page_url.is_none());
    assert!(ok.app_title.is_none());
}

#[tokio::test]
async fn test_log_failure_aborts_fetch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds"));
            then.status(200).json_body(builds_body());
        })
        .await;
    mock_log(&server, "b-ok").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-err/log"));
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/apps/{APP}/builds/b-ok/artifacts"));
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;

    let config = config(&server);
    let enricher = BuildEnricher::new(BitriseClient::new(&config).unwrap(), &config);
    let err = enricher.fetch_and_enrich().await.unwrap_err();

    assert!(matches!(err, FetchError::Log { ref slug, .. } if slug == "b-err"));
}
