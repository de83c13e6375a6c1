use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::error::AppError;
use crate::models::*;
use crate::services::{PaymentLedgerService, PaymentService};

#[utoipa::path(
    post,
    path = "/payments/link",
    tag = "payments",
    request_body = CreatePaymentLinkRequest,
    responses(
        (status = 200, description = "Pending attempt created, signed payment URL returned", body = PaymentLinkResponse),
        (status = 400, description = "Invalid amount or custom parameters")
    )
)]
pub async fn create_payment_link(
    payment_service: web::Data<PaymentService>,
    request: web::Json<CreatePaymentLinkRequest>,
) -> Result<HttpResponse> {
    match payment_service
        .generate_payment_link(request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/payments/{inv_id}",
    tag = "payments",
    params(
        ("inv_id" = i64, Path, description = "Invoice id")
    ),
    responses(
        (status = 200, description = "Payment attempt", body = Payment),
        (status = 404, description = "No attempt with this invoice id")
    )
)]
pub async fn get_payment(
    ledger: web::Data<PaymentLedgerService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let inv_id = path.into_inner();
    match ledger.get_payment(inv_id).await {
        Ok(Some(payment)) => Ok(HttpResponse::Ok().json(ApiResponse::success(payment))),
        Ok(None) => Ok(AppError::UnknownTransaction(inv_id).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/link", web::post().to(create_payment_link))
            .route("/{inv_id}", web::get().to(get_payment)),
    );
}
