use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Utc;

use crate::error::AppError;
use crate::models::market::{CandleQuery, PingRequest};
use crate::services::market_data::generate_candles;
use crate::services::session_manager::SessionManager;

const DEFAULT_CANDLES: usize = 101;
const MAX_CANDLES: usize = 500;

#[get("/price")]
async fn latest_price(manager: web::Data<Arc<SessionManager>>) -> Result<impl Responder, AppError> {
    let sample = manager
        .current_price()
        .ok_or_else(|| AppError::NotFound("No price sampled yet".into()))?;
    Ok(HttpResponse::Ok().json(sample))
}

#[get("/market/candles")]
async fn candles(query: web::Query<CandleQuery>) -> impl Responder {
    let count = query.count.unwrap_or(DEFAULT_CANDLES).min(MAX_CANDLES);
    let data = generate_candles(&mut rand::thread_rng(), count, Utc::now());
    HttpResponse::Ok().json(data)
}

#[post("/ping")]
async fn ping(body: web::Json<PingRequest>) -> Result<impl Responder, AppError> {
    let message = body
        .into_inner()
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("invalid params".into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "pong": format!("received message: {message}")
    })))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(latest_price).service(candles).service(ping);
}
