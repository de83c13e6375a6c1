use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::payment::create_payment_link,
        handlers::payment::get_payment,
        handlers::subscription::get_subscription,
    ),
    components(schemas(
        CreatePaymentLinkRequest,
        PaymentLinkResponse,
        Payment,
        PaymentStatus,
        SubscriptionResponse,
        ApiError,
    )),
    tags(
        (name = "payments", description = "Payment link creation and attempt lookup"),
        (name = "subscriptions", description = "Subscription status")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
}
