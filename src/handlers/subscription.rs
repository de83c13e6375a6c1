use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::SubscriptionService;

#[utoipa::path(
    get,
    path = "/subscriptions/{user_id}",
    tag = "subscriptions",
    params(
        ("user_id" = i64, Path, description = "Bot user id")
    ),
    responses(
        (status = 200, description = "Subscription status, active derived from expiry", body = SubscriptionResponse)
    )
)]
pub async fn get_subscription(
    subscription_service: web::Data<SubscriptionService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match subscription_service.get_subscription(user_id).await {
        Ok(subscription) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SubscriptionResponse::from_record(user_id, subscription),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/subscriptions").route("/{user_id}", web::get().to(get_subscription)));
}
