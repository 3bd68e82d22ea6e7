//! Integration tests for the galpon-vms HTTP API
//!
//! Drives the full wizard flow through the router: pre-alerta upload creates
//! a shipment, pre-ruteo upload advances it, verification scans classify
//! packages, finalize closes the shipment, and a clasificación round follows.
//! Also covers operator identity, provider scoping, and the error envelope.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use galpon_common::db::init_memory_database;
use galpon_vms::ingest::clasificacion::{COL_ORDEN_VISITA, COL_TRACKING, COL_VEHICULO};
use galpon_vms::{build_router, AppState};
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

const BOUNDARY: &str = "galpon-test-boundary";

/// Test helper: in-memory database and router over it
async fn setup() -> (axum::Router, SqlitePool) {
    let pool = init_memory_database().await.unwrap();
    let app = build_router(AppState::new(pool.clone()));
    (app, pool)
}

async fn seed_provider(pool: &SqlitePool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = galpon_common::time::now_rfc3339();
    sqlx::query(
        "INSERT INTO providers (id, name, responsible, created_at, updated_at) VALUES (?, ?, NULL, ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_vms_operator(pool: &SqlitePool, name: &str, provider_id: Uuid) {
    sqlx::query(
        "INSERT INTO operators (id, name, role, provider_id, active, created_at) VALUES (?, ?, 'VMS', ?, 1, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(provider_id.to_string())
    .bind(galpon_common::time::now_rfc3339())
    .execute(pool)
    .await
    .unwrap();
}

/// Test helper: request with the given operator in `X-Operator`
fn request(method: &str, uri: &str, operator: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Operator", operator)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, operator: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Operator", operator)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: multipart upload with text fields plus one xlsx file field
fn upload_request(
    uri: &str,
    operator: &str,
    fields: &[(&str, &str)],
    file_bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        concat!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"upload.xlsx\"\r\n",
            "Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Operator", operator)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

// =============================================================================
// Spreadsheet fixtures
// =============================================================================

/// Carrier manifest: headers on the first row, one row per tracking
fn pre_alerta_file(trackings: &[&str]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, header) in galpon_vms::ingest::pre_alerta::REQUIRED_HEADERS
        .iter()
        .enumerate()
    {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, tracking) in trackings.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, "MELI").unwrap();
        worksheet.write_string(row, 2, *tracking).unwrap();
        worksheet.write_number(row, 3, 1.5).unwrap();
        worksheet
            .write_string(row, 6, format!("Cliente {i}"))
            .unwrap();
        worksheet.write_string(row, 10, "CABA").unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Route plan: four title rows, headers at row index 4, column A blank
fn pre_ruteo_file(pedidos: &[&str]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 1, "Listado de Reparto").unwrap();
    for (i, header) in galpon_vms::ingest::pre_ruteo::REQUIRED_HEADERS
        .iter()
        .enumerate()
    {
        worksheet.write_string(4, i as u16 + 1, *header).unwrap();
    }
    for (i, pedido) in pedidos.iter().enumerate() {
        let row = i as u32 + 5;
        worksheet.write_string(row, 2, "Libreria Central").unwrap();
        worksheet.write_number(row, 5, 45292.0).unwrap();
        worksheet.write_string(row, 8, "R. Gonzalez").unwrap();
        worksheet.write_string(row, 10, *pedido).unwrap();
        worksheet.write_number(row, 14, 12.5).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Sorting sheet addressed by fixed column positions
fn clasificacion_file(rows: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Orden").unwrap();
    for (i, (tracking, vehiculo, orden)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet
            .write_string(row, COL_TRACKING as u16, *tracking)
            .unwrap();
        worksheet
            .write_string(row, COL_VEHICULO as u16, *vehiculo)
            .unwrap();
        worksheet
            .write_string(row, COL_ORDEN_VISITA as u16, *orden)
            .unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

// =============================================================================
// Flow helpers
// =============================================================================

async fn upload_pre_alerta(
    app: &axum::Router,
    operator: &str,
    provider_id: Uuid,
    date: &str,
    trackings: &[&str],
) -> Value {
    let provider = provider_id.to_string();
    let request = upload_request(
        "/api/vms/pre-alerta/upload",
        operator,
        &[("provider_id", provider.as_str()), ("shipment_date", date)],
        &pre_alerta_file(trackings),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

async fn upload_pre_ruteo(app: &axum::Router, shipment_id: &str, pedidos: &[&str]) -> Value {
    let request = upload_request(
        "/api/vms/pre-ruteo/upload",
        "admin",
        &[("shipment_id", shipment_id)],
        &pre_ruteo_file(pedidos),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

async fn scan(app: &axum::Router, shipment_id: &str, tracking: &str) -> Value {
    let request = json_request(
        "POST",
        "/api/vms/verification/scan",
        "admin",
        json!({ "shipment_id": shipment_id, "tracking_number": tracking }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Seed one provider and walk a shipment to FINALIZADO with four scans
async fn finalized_shipment(app: &axum::Router, pool: &SqlitePool) -> String {
    let provider_id = seed_provider(pool, "Urbano").await;
    let uploaded =
        upload_pre_alerta(app, "admin", provider_id, "2026-03-01", &["AR-OK", "AR-FC", "AR-MISS"])
            .await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap().to_string();

    upload_pre_ruteo(app, &shipment_id, &["AR-OK", "AR-PREV"]).await;
    for tracking in ["AR-OK", "AR-FC", "AR-PREV", "AR-EXTRA"] {
        scan(app, &shipment_id, tracking).await;
    }

    let request = json_request(
        "POST",
        "/api/vms/verification/finalize",
        "admin",
        json!({ "shipment_id": shipment_id }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    shipment_id
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_requires_no_operator() {
    let (app, _pool) = setup().await;

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "galpon-vms");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_missing_operator_header_is_401() {
    let (app, _pool) = setup().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/vms/shipments")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_operator_is_401() {
    let (app, _pool) = setup().await;

    let response = app
        .oneshot(request("GET", "/api/vms/shipments", "nobody"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Wizard flow: pre-alerta → pre-ruteo → scans → finalize
// =============================================================================

#[tokio::test]
async fn test_pre_alerta_upload_creates_shipment() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let body = upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1", "AR2"]).await;
    assert_eq!(body["status"], "PRE_ALERTA");
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["skipped"], 0);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = extract_json(response.into_body()).await;
    assert_eq!(list["shipments"].as_array().unwrap().len(), 1);
    assert_eq!(list["shipments"][0]["provider_name"], "Urbano");
    assert_eq!(list["shipments"][0]["pre_alerta_count"], 2);
    assert_eq!(list["shipments"][0]["status"], "PRE_ALERTA");
    assert!(list["stats"]["total_packages"].is_number());
}

#[tokio::test]
async fn test_pre_alerta_upload_unknown_provider_is_400() {
    let (app, _pool) = setup().await;

    let provider = Uuid::new_v4().to_string();
    let request = upload_request(
        "/api/vms/pre-alerta/upload",
        "admin",
        &[
            ("provider_id", provider.as_str()),
            ("shipment_date", "2026-03-01"),
        ],
        &pre_alerta_file(&["AR1"]),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_pre_alerta_rejected_file_persists_nothing() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    // Sheet without the required carrier headers
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Tracking Number").unwrap();
    worksheet.write_string(1, 0, "AR1").unwrap();
    let bad_file = workbook.save_to_buffer().unwrap();

    let provider = provider_id.to_string();
    let request = upload_request(
        "/api/vms/pre-alerta/upload",
        "admin",
        &[
            ("provider_id", provider.as_str()),
            ("shipment_date", "2026-03-01"),
        ],
        &bad_file,
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_pre_ruteo_advances_shipment_once() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let uploaded = upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1"]).await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap().to_string();

    let body = upload_pre_ruteo(&app, &shipment_id, &["AR1"]).await;
    assert_eq!(body["status"], "PRE_RUTEO");
    assert_eq!(body["inserted"], 1);

    // Second route plan for the same shipment is an illegal transition
    let request = upload_request(
        "/api/vms/pre-ruteo/upload",
        "admin",
        &[("shipment_id", shipment_id.as_str())],
        &pre_ruteo_file(&["AR1"]),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_scan_classification_and_stats() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let uploaded =
        upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR-OK", "AR-FC", "AR-MISS"])
            .await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap().to_string();
    upload_pre_ruteo(&app, &shipment_id, &["AR-OK", "AR-PREV"]).await;

    // In both sheets
    let body = scan(&app, &shipment_id, "AR-OK").await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["already_scanned"], false);
    assert_eq!(body["stats"]["total_scanned"], 1);

    // First scan opened verification
    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments", "admin"))
        .await
        .unwrap();
    let list = extract_json(response.into_body()).await;
    assert_eq!(list["shipments"][0]["status"], "VERIFICACION");

    // Manifested but not routed
    let body = scan(&app, &shipment_id, "AR-FC").await;
    assert_eq!(body["status"], "FUERA_COBERTURA");

    // Routed from an earlier manifest
    let body = scan(&app, &shipment_id, "AR-PREV").await;
    assert_eq!(body["status"], "PREVIO");

    // In neither sheet
    let body = scan(&app, &shipment_id, "AR-EXTRA").await;
    assert_eq!(body["status"], "SOBRANTE");
    assert_eq!(body["stats"]["expected"], 3);
    assert_eq!(body["stats"]["total_scanned"], 4);
    assert_eq!(body["stats"]["ok"], 1);
    assert_eq!(body["stats"]["fuera_cobertura"], 1);
    assert_eq!(body["stats"]["previo"], 1);
    assert_eq!(body["stats"]["sobrante"], 1);
    assert_eq!(body["stats"]["faltante"], 1);
}

#[tokio::test]
async fn test_duplicate_scan_is_idempotent() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let uploaded = upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1"]).await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap().to_string();
    upload_pre_ruteo(&app, &shipment_id, &["AR1"]).await;

    let first = scan(&app, &shipment_id, "AR1").await;
    assert_eq!(first["already_scanned"], false);

    let second = scan(&app, &shipment_id, "AR1").await;
    assert_eq!(second["already_scanned"], true);
    assert_eq!(second["status"], first["status"]);
    assert_eq!(second["scanned_at"], first["scanned_at"]);
    assert_eq!(second["stats"]["total_scanned"], 1);
}

#[tokio::test]
async fn test_scan_before_pre_ruteo_is_409() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let uploaded = upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1"]).await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/verification/scan",
            "admin",
            json!({ "shipment_id": shipment_id, "tracking_number": "AR1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_finalize_closes_shipment_and_is_terminal() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments", "admin"))
        .await
        .unwrap();
    let list = extract_json(response.into_body()).await;
    assert_eq!(list["shipments"][0]["status"], "FINALIZADO");

    // Finalizing again is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/verification/finalize",
            "admin",
            json!({ "shipment_id": shipment_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // As is scanning a closed shipment
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/verification/scan",
            "admin",
            json!({ "shipment_id": shipment_id, "tracking_number": "AR-LATE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// =============================================================================
// Clasificación round
// =============================================================================

#[tokio::test]
async fn test_clasificacion_upload_keeps_only_ok_scans() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let file = clasificacion_file(&[
        ("AR-OK", "Camion 1", "-"),
        ("AR-FC", "Camion 1", "Calle 2"),
    ]);
    let request = upload_request(
        "/api/vms/clasificacion/upload",
        "admin",
        &[("shipment_id", shipment_id.as_str())],
        &file,
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_rows"], 1);
    assert_eq!(body["total_vehiculos"], 1);
    assert_eq!(body["skipped_not_ok"], 1);
    assert_eq!(body["paquetes_por_vehiculo"][0]["vehiculo"], "Camion 1");
    assert_eq!(body["paquetes_por_vehiculo"][0]["paquetes"], 1);
}

#[tokio::test]
async fn test_clasificacion_requires_finalized_shipment() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;

    let uploaded = upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1"]).await;
    let shipment_id = uploaded["shipment_id"].as_str().unwrap();

    let request = upload_request(
        "/api/vms/clasificacion/upload",
        "admin",
        &[("shipment_id", shipment_id)],
        &clasificacion_file(&[("AR1", "Camion 1", "-")]),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clasificacion_scan_outcomes_and_finalize() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let request_upload = upload_request(
        "/api/vms/clasificacion/upload",
        "admin",
        &[("shipment_id", shipment_id.as_str())],
        &clasificacion_file(&[("AR-OK", "Camion 1", "-")]),
    );
    let response = app.clone().oneshot(request_upload).await.unwrap();
    let uploaded = extract_json(response.into_body()).await;
    let clasificacion_id = uploaded["clasificacion_id"].as_str().unwrap().to_string();

    // Unknown tracking answers 200 with NO_ENCONTRADO
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/clasificacion/scan",
            "admin",
            json!({ "clasificacion_id": clasificacion_id, "tracking_number": "AR-FC" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "NO_ENCONTRADO");

    // First scan classifies, second reports the earlier scan
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/clasificacion/scan",
            "admin",
            json!({ "clasificacion_id": clasificacion_id, "tracking_number": "AR-OK" }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "CLASIFICADO");
    assert_eq!(body["paquete"]["vehiculo"], "Camion 1");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/clasificacion/scan",
            "admin",
            json!({ "clasificacion_id": clasificacion_id, "tracking_number": "AR-OK" }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "YA_ESCANEADO");
    assert_eq!(body["paquete"]["escaneado"], true);

    // Stats show full progress
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/vms/clasificacion/{clasificacion_id}/stats"),
            "admin",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["stats"]["escaneados"], 1);
    assert_eq!(body["stats"]["porcentaje"], 100);
    assert_eq!(body["vehiculos"][0]["vehiculo"], "Camion 1");

    // Finalize, then further scans are rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/vms/clasificacion/{clasificacion_id}/finalize"),
            "admin",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["finalizado"], true);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/vms/clasificacion/scan",
            "admin",
            json!({ "clasificacion_id": clasificacion_id, "tracking_number": "AR-OK" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_clasificacion_reupload_replaces_previous() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    for vehiculo in ["Camion 1", "Camion 2"] {
        let request = upload_request(
            "/api/vms/clasificacion/upload",
            "admin",
            &[("shipment_id", shipment_id.as_str())],
            &clasificacion_file(&[("AR-OK", vehiculo, "-")]),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/clasificaciones", "admin"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);

    // The shipment resolves to the replacement file
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/vms/shipments/{shipment_id}/clasificacion"),
            "admin",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let clasificacion_id = body["clasificacion"]["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/vms/clasificacion/{clasificacion_id}/paquetes"),
            "admin",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["paquetes"][0]["vehiculo"], "Camion 2");
}

#[tokio::test]
async fn test_search_tracking_finds_vehicle_assignment() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let request_upload = upload_request(
        "/api/vms/clasificacion/upload",
        "admin",
        &[("shipment_id", shipment_id.as_str())],
        &clasificacion_file(&[("AR-OK", "Camion 1", "-")]),
    );
    app.clone().oneshot(request_upload).await.unwrap();

    // Case-insensitive match
    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/search-tracking?tracking=ar-ok", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["found"], true);
    assert_eq!(body["tracking_number"], "AR-OK");
    assert_eq!(body["transporte"]["vehiculo"], "Camion 1");
    assert_eq!(body["transporte"]["orden"], 1);
    assert_eq!(body["proveedor"], "Urbano");
    assert_eq!(body["lote"]["fecha"], "2026-03-01");
    assert_eq!(body["lote"]["fecha_formateada"], "01/03/2026");
    assert_eq!(body["escaneo"]["escaneado"], false);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/vms/search-tracking?tracking=NADA",
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["found"], false);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/vms/search-tracking?tracking=%20%20",
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Exports
// =============================================================================

#[tokio::test]
async fn test_shipment_report_download() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/vms/shipments/{shipment_id}/report"),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = headers
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"verificacion_2026-03-01_"));

    // Four scans plus the unscanned faltante, one row each plus the header
    let bytes = extract_bytes(response.into_body()).await;
    let mut reader =
        calamine::Xlsx::new(std::io::Cursor::new(bytes)).expect("Should open workbook");
    use calamine::Reader;
    let range = reader.worksheet_range("Verificación").unwrap();
    assert_eq!(range.rows().count(), 6);
}

#[tokio::test]
async fn test_clasificacion_export_download() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let request_upload = upload_request(
        "/api/vms/clasificacion/upload",
        "admin",
        &[("shipment_id", shipment_id.as_str())],
        &clasificacion_file(&[("AR-OK", "Camion 1", "-")]),
    );
    let response = app.clone().oneshot(request_upload).await.unwrap();
    let uploaded = extract_json(response.into_body()).await;
    let clasificacion_id = uploaded["clasificacion_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/vms/clasificacion/{clasificacion_id}/export"),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"clasificacion_2026-03-01_"));

    let bytes = extract_bytes(response.into_body()).await;
    let mut reader =
        calamine::Xlsx::new(std::io::Cursor::new(bytes)).expect("Should open workbook");
    use calamine::Reader;
    let range = reader.worksheet_range("Clasificación").unwrap();
    assert_eq!(range.rows().count(), 2);
}

// =============================================================================
// Provider scoping
// =============================================================================

#[tokio::test]
async fn test_vms_operator_sees_only_own_provider() {
    let (app, pool) = setup().await;
    let own = seed_provider(&pool, "Urbano").await;
    let other = seed_provider(&pool, "Ocasa").await;
    seed_vms_operator(&pool, "maria", own).await;

    upload_pre_alerta(&app, "admin", own, "2026-03-01", &["AR1"]).await;
    let foreign = upload_pre_alerta(&app, "admin", other, "2026-03-01", &["AR2"]).await;
    let foreign_id = foreign["shipment_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments", "maria"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["shipments"].as_array().unwrap().len(), 1);
    assert_eq!(body["shipments"][0]["provider_name"], "Urbano");

    // Another provider's shipment is off limits
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/vms/shipments/{foreign_id}"),
            "maria",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Uploading for another provider likewise
    let provider = other.to_string();
    let response = app
        .clone()
        .oneshot(upload_request(
            "/api/vms/pre-alerta/upload",
            "maria",
            &[
                ("provider_id", provider.as_str()),
                ("shipment_date", "2026-03-02"),
            ],
            &pre_alerta_file(&["AR3"]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_active_shipments_requires_assigned_provider() {
    let (app, pool) = setup().await;
    let provider_id = seed_provider(&pool, "Urbano").await;
    seed_vms_operator(&pool, "maria", provider_id).await;

    upload_pre_alerta(&app, "admin", provider_id, "2026-03-01", &["AR1"]).await;

    // Scanner station with a provider gets its recent shipments
    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments/active", "maria"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Admin carries no provider assignment
    let response = app
        .clone()
        .oneshot(request("GET", "/api/vms/shipments/active", "admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "no_provider");
}

// =============================================================================
// Deletion and error envelope
// =============================================================================

#[tokio::test]
async fn test_delete_shipment_removes_dependents() {
    let (app, pool) = setup().await;
    let shipment_id = finalized_shipment(&app, &pool).await;

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/vms/shipments/{shipment_id}"),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["deleted"], true);

    let scans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scanned_packages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(scans, 0);
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pre_alerta_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(records, 0);
}

#[tokio::test]
async fn test_not_found_envelope() {
    let (app, _pool) = setup().await;

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/vms/shipments/{}", Uuid::new_v4()),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_upload_missing_fields_is_400() {
    let (app, _pool) = setup().await;

    let request = upload_request(
        "/api/vms/pre-alerta/upload",
        "admin",
        &[],
        &pre_alerta_file(&["AR1"]),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
