// src/occupancy_handlers.rs
//! Occupancy dashboard endpoints
//!
//! Endpoints:
//!   GET|POST /api/v1/occupancy/grid_data        grid in the configured layout
//!   GET      /api/v1/occupancy/zones            zone layout
//!   GET      /api/v1/occupancy/rows             row/level layout
//!   GET      /api/v1/occupancy/locations/{id}   one location with its occupancy record

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use crate::AppState;
use crate::auth::get_current_user;
use crate::error::{ApiError, ApiResult};
use crate::grid::{build_grid, parse_position, zone_for, GridPosition};
use crate::handlers::ApiResponse;
use crate::models::{GridLayoutKind, OccupancyRecord};
use crate::occupancy::OccupancyClassifier;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/occupancy")
            .route("/grid_data", web::get().to(get_grid_data))
            .route("/grid_data", web::post().to(get_grid_data))
            .route("/zones", web::get().to(get_zone_grid))
            .route("/rows", web::get().to(get_row_grid))
            .route("/locations/{id}", web::get().to(get_location_occupancy)),
    );
}

async fn respond_with_grid(
    app_state: &AppState,
    http_request: &HttpRequest,
    kind: GridLayoutKind,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(http_request)?;
    log::info!("🎨 Grid data request ({}) from {} ({})", kind, claims.username, claims.role);

    let response = build_grid(
        app_state.inventory.as_ref(),
        &app_state.config.warehouse,
        kind,
        Utc::now(),
    )
    .await;

    Ok(HttpResponse::Ok().json(response))
}

// ==================== GRID ====================

pub async fn get_grid_data(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let kind = app_state.config.warehouse.layout;
    respond_with_grid(&app_state, &http_request, kind).await
}

pub async fn get_zone_grid(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    respond_with_grid(&app_state, &http_request, GridLayoutKind::Zones).await
}

pub async fn get_row_grid(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    respond_with_grid(&app_state, &http_request, GridLayoutKind::Rows).await
}

// ==================== LOCATION DETAIL ====================

#[derive(Debug, Serialize)]
pub struct LocationDetail {
    pub id: i64,
    pub name: String,
    pub barcode: Option<String>,
    pub tracked: bool,
    pub zone: String,
    pub zone_label: String,
    pub position: Option<GridPosition>,
    pub occupancy: OccupancyRecord,
}

pub async fn get_location_occupancy(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;
    let location_id = path.into_inner();
    log::info!("🔎 Location {} requested by {}", location_id, claims.username);
    let settings = &app_state.config.warehouse;

    let location = app_state
        .inventory
        .location_by_id(location_id)
        .await?
        .ok_or_else(|| ApiError::location_not_found(location_id))?;

    let classified = OccupancyClassifier::new(settings)
        .classify(app_state.inventory.as_ref(), vec![location], Utc::now())
        .await
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::InternalServerError("Classification returned no record".to_string()))?;

    let (zone, zone_label) = if classified.tracked {
        zone_for(&classified.location.name, settings)
    } else {
        (settings.default_zone.key.as_str(), settings.default_zone.label.as_str())
    };

    let detail = LocationDetail {
        id: classified.location.id,
        position: parse_position(&classified.location.name, &settings.name_delimiter, settings.max_column).ok(),
        zone: zone.to_string(),
        zone_label: zone_label.to_string(),
        name: classified.location.name,
        barcode: classified.location.barcode,
        tracked: classified.tracked,
        occupancy: classified.occupancy,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Service;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use actix_web_httpauth::middleware::HttpAuthentication;
    use chrono::Duration;
    use crate::auth::{issue_token, jwt_middleware, AuthService};
    use crate::config::Config;
    use crate::db::test_pool;
    use crate::models::{Location, Order};
    use crate::repositories::memory::MemoryInventoryStore;

    const SECRET: &str = "test_secret_123456789012345678901234567890";

    fn store() -> MemoryInventoryStore {
        let order = Order {
            id: 1,
            name: "SO001".to_string(),
            source_location_id: 102,
            state: "ready_for_packaging".to_string(),
            customer: Some("Acme Ltd".to_string()),
            container_ref: Some("BOX-4".to_string()),
            external_ref: Some("MG-000123".to_string()),
            write_date: Utc::now() - Duration::days(3),
            state_changed_at: None,
        };
        MemoryInventoryStore::new(
            vec![
                Location::new(101, "A-E-01", Some(19)),
                Location::new(102, "A-E-02", Some(19)),
                Location::new(103, "M-001", Some(19)),
                Location::new(300, "Q-1", Some(55)),
            ],
            vec![order],
        )
    }

    async fn state(store: MemoryInventoryStore) -> Arc<AppState> {
        let mut config = Config::default();
        config.auth.jwt_secret = SECRET.to_string();
        Arc::new(AppState {
            db_pool: test_pool().await,
            config,
            inventory: Arc::new(store),
        })
    }

    fn bearer() -> String {
        let token = issue_token(SECRET, "u-1", "dispatcher", "viewer", Duration::hours(1));
        format!("Bearer {}", token)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(web::Data::new(Arc::new(AuthService::new(SECRET))))
                    .service(
                        web::scope("/api/v1")
                            .wrap(HttpAuthentication::bearer(jwt_middleware))
                            .configure(configure_routes),
                    ),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_grid_data_uses_configured_layout() {
        let app = app!(state(store()).await);
        let req = test::TestRequest::post()
            .uri("/api/v1/occupancy/grid_data")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["summary"]["total"], 3);
        assert_eq!(body["summary"]["occupied"], 1);
        assert_eq!(body["summary"]["free"], 2);
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows[0]["row"], "A");
        assert_eq!(rows[0]["columns"], serde_json::json!(["01", "02"]));
        let occupied = &rows[0]["levels"][0]["locations"][1];
        assert_eq!(occupied["status"], "occupied");
        assert_eq!(occupied["container"], "BOX-4");
        assert_eq!(occupied["duration"], 3.0);
    }

    #[actix_rt::test]
    async fn test_zone_grid() {
        let app = app!(state(store()).await);
        let req = test::TestRequest::get()
            .uri("/api/v1/occupancy/zones")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        let zones = body["zones"].as_array().unwrap();
        assert_eq!(zones[0]["name"], "malak_sklad");
        assert_eq!(zones[0]["count"], 1);
        assert_eq!(zones.last().unwrap()["name"], "other");
        assert_eq!(zones.last().unwrap()["count"], 2);
    }

    #[actix_rt::test]
    async fn test_failure_is_still_a_success_response() {
        let mut failing = store();
        failing.fail_locations = true;
        let app = app!(state(failing).await);
        let req = test::TestRequest::get()
            .uri("/api/v1/occupancy/rows")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
        assert_eq!(body["rows"], serde_json::json!([]));
        assert_eq!(body["summary"]["total"], 0);
    }

    #[actix_rt::test]
    async fn test_location_detail() {
        let app = app!(state(store()).await);
        let req = test::TestRequest::get()
            .uri("/api/v1/occupancy/locations/102")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let data = &body["data"];
        assert_eq!(data["tracked"], true);
        assert_eq!(data["zone"], "other");
        assert_eq!(data["position"]["column"], 2);
        assert_eq!(data["occupancy"]["status"], "occupied");
        assert_eq!(data["occupancy"]["external_ref"], "MG-000123");
        assert_eq!(data["occupancy"]["customer"], "Acme Ltd");
    }

    #[actix_rt::test]
    async fn test_untracked_location_detail_is_free() {
        let app = app!(state(store()).await);
        let req = test::TestRequest::get()
            .uri("/api/v1/occupancy/locations/300")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["tracked"], false);
        assert_eq!(body["data"]["occupancy"]["status"], "free");
        assert!(body["data"]["position"].is_null());
    }

    #[actix_rt::test]
    async fn test_unknown_location_is_not_found() {
        let app = app!(state(store()).await);
        let req = test::TestRequest::get()
            .uri("/api/v1/occupancy/locations/999")
            .insert_header((header::AUTHORIZATION, bearer()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_requests_without_valid_token_are_rejected() {
        let app = app!(state(store()).await);

        for auth in [None, Some("Bearer not-a-token".to_string())] {
            let mut req = test::TestRequest::get().uri("/api/v1/occupancy/rows");
            if let Some(value) = auth {
                req = req.insert_header((header::AUTHORIZATION, value));
            }
            let status = match app.call(req.to_request()).await {
                Ok(resp) => resp.status(),
                Err(err) => err.error_response().status(),
            };
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
