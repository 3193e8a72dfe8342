use actix_csp_compat::prelude::*;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

async fn index(req: HttpRequest) -> HttpResponse {
    let nonce = req.script_nonce().unwrap_or_default();
    let body = format!(
        "<html><body>\
         <script nonce=\"{nonce}\">console.log('inline, but allowed');</script>\
         </body></html>"
    );
    HttpResponse::Ok().content_type("text/html").body(body)
}

async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body("{}")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let options = CspOptions::new()
        .default_src(["none"])
        .script_src(["self"])
        .style_src(["self"])
        .img_src(["self", "data:"])
        .connect_src(["self"])
        .report_uri("/csp_report");

    HttpServer::new(move || {
        App::new()
            .wrap(csp_middleware(options.clone()).expect("invalid CSP configuration"))
            .route("/", web::get().to(index))
            .service(
                web::resource("/metrics")
                    .route(web::get().to(metrics))
                    .wrap(CspOverride::disable()),
            )
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
