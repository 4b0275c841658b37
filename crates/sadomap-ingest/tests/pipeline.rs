//! End-to-end ingestion: wiremock Sheets API → `PoiStore`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sadomap_core::{
    AreaCatalog, AreaConfig, AreaId, Category, ColumnLayout, CoordinateSource, Coordinates, Field,
    IdStrategy, PoiKind,
};
use sadomap_ingest::{
    AreaErrorKind, EventSink, IngestEvent, PoiStore, RecordingSink, RetryPolicy, SheetsClient,
    SourceReader,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHEET_PATH: &str = "/v4/spreadsheets/sheet-123/values/RYOTSU_AIKAWA";

fn catalog() -> AreaCatalog {
    AreaCatalog {
        default_coordinates: Coordinates::new(38.0183, 138.3681),
        region: None,
        areas: vec![
            AreaConfig {
                id: AreaId::new("RYOTSU_AIKAWA"),
                sheet: "RYOTSU_AIKAWA".to_string(),
                label: Some("両津・相川".to_string()),
                kind: PoiKind::Restaurant,
                columns: ColumnLayout::Fixed {
                    fields: BTreeMap::from([
                        (Field::Name, 0),
                        (Field::Wkt, 1),
                        (Field::Closed, 2),
                        (Field::Genre, 3),
                    ]),
                },
                coordinates: CoordinateSource::Wkt,
                ids: IdStrategy::Positional,
            },
            AreaConfig {
                id: AreaId::new("SNACK"),
                sheet: "SNACK".to_string(),
                label: None,
                kind: PoiKind::Restaurant,
                columns: ColumnLayout::default(),
                coordinates: CoordinateSource::Wkt,
                ids: IdStrategy::Positional,
            },
        ],
    }
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::ZERO,
        attempt_timeout: Duration::from_secs(5),
    }
}

fn store_for(server: &MockServer, max_retries: u32, sink: &Arc<RecordingSink>) -> PoiStore {
    let client = SheetsClient::with_base_url(
        Some("test-key"),
        Some("sheet-123"),
        5,
        "sadomap-test/0.1",
        &server.uri(),
    )
    .expect("client construction should not fail");
    PoiStore::with_sink(
        Arc::new(client) as Arc<dyn SourceReader>,
        catalog(),
        policy(max_retries),
        Arc::clone(sink) as Arc<dyn EventSink>,
    )
}

fn values_body() -> serde_json::Value {
    serde_json::json!({
        "values": [
            ["名称", "WKT", "閉店", "ジャンル"],
            ["和食店A", "POINT (138.40 38.05)", "FALSE", "寿司"],
            ["", "POINT (138.41 38.06)", "FALSE", "カフェ"],
            ["洋食屋C", "POINT (138.42 38.07)", "TRUE", "ハンバーグ"]
        ]
    })
}

fn area() -> Vec<AreaId> {
    vec![AreaId::new("RYOTSU_AIKAWA")]
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn sheet_rows_become_pois() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(values_body()))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    assert!(batch.errors.is_empty());
    assert_eq!(batch.data.len(), 2, "the nameless row is skipped");

    let first = &batch.data[0];
    assert_eq!(first.name, "和食店A");
    assert!((first.coordinates.lat - 38.05).abs() < 1e-12);
    assert!((first.coordinates.lng - 138.40).abs() < 1e-12);
    assert_eq!(first.category, vec![Category::Japanese]);
    assert_eq!(first.area.as_str(), "RYOTSU_AIKAWA");
    assert!(!first.flags.is_closed);

    let third = &batch.data[1];
    assert_eq!(third.name, "洋食屋C");
    assert_eq!(third.id, "RYOTSU_AIKAWA-4");
    assert!(third.flags.is_closed);
    assert_eq!(third.category, vec![Category::Western]);

    assert!(matches!(
        sink.events().as_slice(),
        [IngestEvent::RowRejected { row: 3, .. }]
    ));
}

#[tokio::test]
async fn output_serializes_as_data_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(values_body()))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["data"][0]["name"], "和食店A");
    assert_eq!(json["data"][0]["coordinates"]["lat"], 38.05);
    assert_eq!(json["data"][0]["type"], "restaurant");
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn two_transient_failures_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(values_body()))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    assert!(batch.errors.is_empty());
    assert_eq!(batch.data.len(), 2);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn retries_exhaust_into_area_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    assert!(batch.data.is_empty());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].kind, AreaErrorKind::Network);
    assert_eq!(batch.errors[0].attempts, 4);
    assert_eq!(request_count(&server).await, 4);
    assert!(!store.is_cached(&AreaId::new("RYOTSU_AIKAWA")));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    assert_eq!(batch.errors[0].attempts, 1);
    assert_eq!(request_count(&server).await, 1);
    assert!(matches!(
        sink.events().as_slice(),
        [IngestEvent::AreaFailed { attempts: 1, .. }]
    ));
}

#[tokio::test]
async fn malformed_body_fails_area_as_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"values\": 42}"))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&area(), &CancellationToken::new())
        .await
        .expect("known area");

    assert_eq!(batch.errors[0].kind, AreaErrorKind::Parse);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn positional_ids_are_stable_across_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SHEET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(values_body()))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let cancel = CancellationToken::new();

    let first = store.get_pois(&area(), &cancel).await.unwrap();
    store.clear();
    let second = store.get_pois(&area(), &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn empty_header_sheet_is_an_empty_area_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/SNACK"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "range": "A1" })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::new());
    let store = store_for(&server, 3, &sink);
    let batch = store
        .get_pois(&[AreaId::new("SNACK")], &CancellationToken::new())
        .await
        .expect("known area");

    assert!(batch.data.is_empty());
    assert!(batch.errors.is_empty(), "got: {:?}", batch.errors);
    assert!(sink.events().is_empty());
    assert!(store.is_cached(&AreaId::new("SNACK")));
}
