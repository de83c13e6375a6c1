use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        // The gateway posts server-to-server; CORS only affects browser
        // callers of the status API. Tighten origins in production.
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
