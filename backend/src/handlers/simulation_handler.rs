use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse, Responder};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::simulation::{BacktestQuery, GenerateRequest, SelectStrategyRequest};
use crate::services::session_manager::SessionManager;

#[post("/simulations")]
async fn create_simulation(manager: web::Data<Arc<SessionManager>>) -> impl Responder {
    HttpResponse::Created().json(manager.create().await)
}

#[get("/simulations")]
async fn list_simulations(manager: web::Data<Arc<SessionManager>>) -> impl Responder {
    HttpResponse::Ok().json(manager.list().await)
}

#[get("/simulations/{id}")]
async fn get_simulation(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let view = manager.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[delete("/simulations/{id}")]
async fn delete_simulation(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    manager.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Deleted" })))
}

#[post("/simulations/{id}/generate")]
async fn generate_strategies(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
    body: web::Json<GenerateRequest>,
) -> Result<impl Responder, AppError> {
    let view = manager
        .generate(path.into_inner(), body.into_inner().input)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/simulations/{id}/select")]
async fn select_strategy(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
    body: web::Json<SelectStrategyRequest>,
) -> Result<impl Responder, AppError> {
    let view = manager
        .select_strategy(path.into_inner(), body.into_inner().index)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/simulations/{id}/start")]
async fn start_trading(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let view = manager.start_trading(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/simulations/{id}/complete")]
async fn complete_trade(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let view = manager.complete_trade(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/simulations/{id}/strategies/{index}/backtest")]
async fn strategy_backtest(
    manager: web::Data<Arc<SessionManager>>,
    path: web::Path<(Uuid, usize)>,
    query: web::Query<BacktestQuery>,
) -> Result<impl Responder, AppError> {
    let (id, index) = path.into_inner();
    let period = query.period().map_err(AppError::BadRequest)?;
    let data = manager.backtest(id, index, period).await?;
    Ok(HttpResponse::Ok().json(data))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(create_simulation)
        .service(list_simulations)
        .service(get_simulation)
        .service(delete_simulation)
        .service(generate_strategies)
        .service(select_strategy)
        .service(start_trading)
        .service(complete_trade)
        .service(strategy_backtest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::market::PriceSample;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tokio::sync::watch;

    fn quote(price: f64) -> Option<PriceSample> {
        Some(PriceSample {
            symbol: "BTCUSDT".into(),
            price,
            timestamp: Utc::now(),
        })
    }

    fn manager() -> (watch::Sender<Option<PriceSample>>, Arc<SessionManager>) {
        let (tx, rx) = watch::channel(None);
        let config = Config {
            generation_delay: std::time::Duration::ZERO,
            ..Config::default()
        };
        (tx, Arc::new(SessionManager::new(rx, config)))
    }

    #[actix_web::test]
    async fn walk_through_a_profitable_short() {
        let (tx, mgr) = manager();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mgr))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post().uri("/simulations").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["status"], "idle");
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/generate"))
            .set_json(json!({ "input": "I want steady gains" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["strategies"].as_array().unwrap().len(), 3);
        assert_eq!(body["strategy"]["id"], "trend_following");

        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/select"))
            .set_json(json!({ "index": 2 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["selected_index"], 2);
        assert_eq!(body["strategy"]["risk_level"], "low");

        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/select"))
            .set_json(json!({ "index": -1 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["selected_index"], 2);

        tx.send_replace(quote(65_000.0));
        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/start"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "trading");
        assert_eq!(body["start_price"], 65_000.0);

        tx.send_replace(quote(64_000.0));
        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/complete"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["position"]["type"], "SHORT");
        let pnl = body["position"]["pnl"].as_f64().unwrap();
        assert!((pnl - 153.846).abs() < 1e-2);
    }

    #[actix_web::test]
    async fn start_before_any_price_returns_unchanged_state() {
        let (_tx, mgr) = manager();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mgr))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post().uri("/simulations").to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/start"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "idle");
    }

    #[actix_web::test]
    async fn backtest_route_validates_period_and_index() {
        let (_tx, mgr) = manager();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mgr))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post().uri("/simulations").to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();
        let req = test::TestRequest::post()
            .uri(&format!("/simulations/{id}/generate"))
            .set_json(json!({ "input": "" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/simulations/{id}/strategies/0/backtest?period=180d"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["period"], "180d");
        assert_eq!(body["data"].as_array().unwrap().len(), 180);

        let req = test::TestRequest::get()
            .uri(&format!("/simulations/{id}/strategies/0/backtest?period=7d"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/simulations/{id}/strategies/9/backtest"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn deleted_simulation_is_gone() {
        let (_tx, mgr) = manager();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(mgr))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post().uri("/simulations").to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::delete()
            .uri(&format!("/simulations/{id}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/simulations/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Not Found"));
    }
}
