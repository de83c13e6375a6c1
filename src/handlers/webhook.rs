use std::collections::HashMap;

use actix_web::{HttpResponse, Result, web};
use log::{info, warn};
use serde_json::json;

use crate::external::RobokassaService;
use crate::models::ResultNotification;
use crate::services::PaymentService;

/// Robokassa result notification (ResultURL). Form-encoded POST, delivered
/// at-least-once: anything but a 200 `OK<InvId>` body makes the gateway
/// redeliver, so every outcome here must be safe to replay.
pub async fn robokassa_result(
    form: web::Form<HashMap<String, String>>,
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse> {
    let notification = match ResultNotification::from_form(&form) {
        Ok(notification) => notification,
        Err(e) => {
            warn!("Malformed result notification: {e}");
            return Ok(HttpResponse::BadRequest()
                .content_type("text/plain")
                .body("bad request"));
        }
    };

    info!(
        "Result notification: inv_id={}, out_sum={}",
        notification.inv_id, notification.out_sum
    );

    match payment_service.process_result(&notification).await {
        Ok(inv_id) => Ok(HttpResponse::Ok()
            .content_type("text/plain")
            .body(RobokassaService::result_response(inv_id))),
        Err(e) if e.is_retryable() => {
            warn!(
                "Transient failure for invoice {}, gateway will redeliver: {e}",
                notification.inv_id
            );
            Ok(HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body("error"))
        }
        Err(e) => {
            warn!("Rejected result notification for invoice {}: {e}", notification.inv_id);
            Ok(HttpResponse::BadRequest()
                .content_type("text/plain")
                .body("bad sign"))
        }
    }
}

/// SuccessURL redirect; the user lands here after paying. Informational only,
/// the subscription is driven by the result notification.
pub async fn robokassa_success(query: web::Query<HashMap<String, String>>) -> Result<HttpResponse> {
    let inv_id = query.get("InvId").cloned();
    info!("Payment success redirect for invoice {inv_id:?}");

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Payment received. Your subscription is active, return to the bot.",
        "inv_id": inv_id,
    })))
}

/// FailURL redirect after a cancelled or declined payment.
pub async fn robokassa_fail(query: web::Query<HashMap<String, String>>) -> Result<HttpResponse> {
    let inv_id = query.get("InvId").cloned();
    warn!("Payment fail redirect for invoice {inv_id:?}");

    Ok(HttpResponse::Ok().json(json!({
        "status": "failed",
        "message": "The payment was not completed. Please try again.",
        "inv_id": inv_id,
    })))
}

pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "status": "healthy" })))
}

pub async fn index() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    })))
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook/robokassa")
            .route("/result", web::post().to(robokassa_result))
            .route("/success", web::get().to(robokassa_success))
            .route("/success", web::post().to(robokassa_success))
            .route("/fail", web::get().to(robokassa_fail))
            .route("/fail", web::post().to(robokassa_fail)),
    )
    .route("/health", web::get().to(health))
    .route("/", web::get().to(index));
}
