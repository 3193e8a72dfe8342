use actix_csp_compat::prelude::*;
use actix_web::{test, web, App, HttpRequest, HttpResponse};

async fn default_handler() -> HttpResponse {
    HttpResponse::Ok().body("defaults")
}

fn header_str<B>(res: &actix_web::dev::ServiceResponse<B>, name: &str) -> Option<String> {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn sends_default_headers() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(res.status().is_success());
        let value = header_str(&res, "content-security-policy").expect("CSP header not set");
        assert!(value.contains("default-src 'none'"));
        assert!(value.contains("script-src 'self'"));
        assert!(value.contains("style-src 'self'"));
        assert!(value.contains("img-src 'self'"));
        assert!(value.contains("connect-src 'self'"));
    }

    #[actix_web::test]
    async fn allows_setting_base_uri() {
        let options = CspOptions::new().base_uri(["self", "https://example.com"]);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert_eq!(value, "base-uri 'self' https://example.com");
    }

    #[actix_web::test]
    async fn adds_nonces_to_view_contexts() {
        async fn view_handler(req: HttpRequest) -> HttpResponse {
            let mut context = serde_json::Map::new();
            context.insert(
                "title".to_owned(),
                serde_json::Value::String("demo".to_owned()),
            );
            req.apply_nonce_context(&mut context);

            assert_eq!(context["title"], "demo");
            let body = format!(
                "{}\n{}",
                context["script-nonce"].as_str().unwrap(),
                context["style-nonce"].as_str().unwrap()
            );
            HttpResponse::Ok().content_type("text/html").body(body)
        }

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(view_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(res.status().is_success());
        let value = header_str(&res, "content-security-policy").unwrap();
        let body = test::read_body(res).await;
        let body = std::str::from_utf8(&body).unwrap();
        let nonces: Vec<&str> = body.trim().split('\n').collect();
        assert_eq!(nonces.len(), 2);
        assert!(value.contains(&format!("script-src 'self' 'nonce-{}'", nonces[0])));
        assert!(value.contains(&format!("style-src 'self' 'nonce-{}'", nonces[1])));
    }

    #[actix_web::test]
    async fn allows_unsafe_inline_with_nonce_on_script_src() {
        let options = CspOptions::new()
            .default_src(["none"])
            .script_src(["unsafe-inline"]);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("default-src 'none'"));
        assert!(value.contains("script-src 'unsafe-inline' 'nonce-"));
    }

    #[actix_web::test]
    async fn allows_strict_dynamic_with_nonces() {
        let options = CspOptions::new()
            .script_src(["strict-dynamic"])
            .style_src(["strict-dynamic"])
            .generate_nonces(true);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("script-src 'strict-dynamic' 'nonce-"));
        assert!(value.contains("style-src 'strict-dynamic' 'nonce-"));
    }

    #[actix_web::test]
    async fn allows_nonces_for_script_src_only() {
        let options = CspOptions::new().generate_nonces(NonceRole::Script);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("script-src 'self' 'nonce-"));
        assert!(!value.contains("style-src 'self' 'nonce-"));
    }

    #[actix_web::test]
    async fn allows_nonces_for_style_src_only() {
        let options = CspOptions::new().generate_nonces(NonceRole::Style);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("style-src 'self' 'nonce-"));
        assert!(!value.contains("script-src 'self' 'nonce-"));
    }

    #[actix_web::test]
    async fn sets_headers_for_html_responses() {
        async fn html_handler() -> HttpResponse {
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body("<html></html>")
        }

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(html_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(header_str(&res, "content-security-policy").is_some());
    }

    #[actix_web::test]
    async fn skips_headers_for_non_html_responses() {
        async fn json_handler() -> HttpResponse {
            HttpResponse::Ok()
                .content_type("application/json")
                .body("{}")
        }

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(json_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(header_str(&res, "content-security-policy").is_none());
    }

    #[actix_web::test]
    async fn skips_headers_for_options_requests() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::route().to(default_handler)),
        )
        .await;

        let req = test::TestRequest::with_uri("/")
            .method(actix_web::http::Method::OPTIONS)
            .to_request();
        let res = test::call_service(&app, req).await;

        assert!(res.status().is_success());
        assert!(header_str(&res, "content-security-policy").is_none());
    }

    #[actix_web::test]
    async fn sends_report_only_headers_when_requested() {
        let options = CspOptions::new()
            .default_src(["self"])
            .report_uri("/csp_report")
            .report_only(true);
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(header_str(&res, "content-security-policy").is_none());
        let value = header_str(&res, "content-security-policy-report-only").unwrap();
        assert!(value.contains("default-src 'self'"));
        assert!(value.contains("report-uri /csp_report"));
    }

    #[actix_web::test]
    async fn report_only_without_report_uri_fails_registration() {
        let options = CspOptions::new().default_src(["self"]).report_only(true);
        assert!(matches!(
            csp_middleware(options),
            Err(CspError::MissingReportUri)
        ));
    }

    #[actix_web::test]
    async fn does_not_crash_when_responding_with_an_error() {
        async fn failing_handler() -> Result<HttpResponse, actix_web::Error> {
            Err(actix_web::error::ErrorInternalServerError("broken!"))
        }

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(failing_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(res.status().as_u16(), 500);
        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("default-src 'none'"));
        assert!(value.contains("script-src 'self'"));
    }

    #[actix_web::test]
    async fn allows_bare_sandbox_directive() {
        let options = CspOptions::new().default_src(["self"]).sandbox_flag();
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert_eq!(value, "default-src 'self';sandbox");
    }

    #[actix_web::test]
    async fn coerces_scalar_values_to_lists() {
        let raw = r#"{ "defaultSrc": "self" }"#;
        let options: CspOptions = serde_json::from_str(raw).unwrap();
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(options).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        let value = header_str(&res, "content-security-policy").unwrap();
        assert_eq!(value, "default-src 'self'");
    }

    #[actix_web::test]
    async fn exposes_nonces_to_handlers() {
        async fn nonce_handler(req: HttpRequest) -> HttpResponse {
            let nonces = req.nonces().expect("nonce store missing");
            assert_eq!(nonces.script(), req.script_nonce().as_deref());
            assert_eq!(nonces.style(), req.style_nonce().as_deref());
            HttpResponse::Ok().json(nonces)
        }

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new().generate_nonces(true)).unwrap())
                .route("/", web::get().to(nonce_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(res.status().is_success());
        let body: serde_json::Value = test::read_body_json(res).await;
        let script = body["script"].as_str().unwrap();
        let style = body["style"].as_str().unwrap();
        assert_eq!(script.len(), 32);
        assert_eq!(style.len(), 32);
        assert!(script.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(script, style);
    }

    #[actix_web::test]
    async fn can_be_disabled_on_a_single_route() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(default_handler))
                .service(
                    web::resource("/disabled")
                        .route(web::get().to(default_handler))
                        .wrap(CspOverride::disable()),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(header_str(&res, "content-security-policy").is_some());

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/disabled").to_request()).await;
        assert!(header_str(&res, "content-security-policy").is_none());
    }

    #[actix_web::test]
    async fn can_be_overridden_on_a_single_route() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(default_handler))
                .service(
                    web::resource("/overridden")
                        .route(web::get().to(default_handler))
                        .wrap(CspOverride::options(CspOptions::new().default_src(["self"]))),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("default-src 'none'"));

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/overridden").to_request(),
        )
        .await;
        let value = header_str(&res, "content-security-policy").unwrap();
        assert!(value.contains("default-src 'self'"));
        assert!(!value.contains("default-src 'none'"));
    }

    #[actix_web::test]
    async fn self_disables_when_a_route_override_is_invalid() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(default_handler))
                .service(
                    web::resource("/invalid")
                        .route(web::get().to(default_handler))
                        .wrap(CspOverride::options(CspOptions::new().sandbox(["self"]))),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(header_str(&res, "content-security-policy").is_some());

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/invalid").to_request()).await;
        assert!(res.status().is_success());
        assert!(header_str(&res, "content-security-policy").is_none());
    }

    #[actix_web::test]
    async fn rejects_unknown_configuration_keys() {
        let raw = r#"{ "bananas": "self" }"#;
        assert!(serde_json::from_str::<CspOptions>(raw).is_err());
    }

    #[actix_web::test]
    async fn strict_dynamic_rule_is_opt_in() {
        let options = CspOptions::new()
            .script_src(["strict-dynamic"])
            .generate_nonces(false);

        assert!(CspConfig::new(options.clone()).is_ok());

        let config = CspConfig::builder()
            .options(options)
            .strict_dynamic_requires_nonce(true)
            .build();
        assert!(config.is_err());
    }

    #[actix_web::test]
    async fn sends_standard_header_when_user_agent_is_absent() {
        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new()).unwrap())
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert!(header_str(&res, "content-security-policy").is_some());
        assert!(header_str(&res, "x-content-security-policy").is_none());
        assert!(header_str(&res, "x-webkit-csp").is_none());
    }

    #[actix_web::test]
    async fn respects_a_preparsed_browser_extension() {
        use actix_csp_compat::{Browser, BrowserFamily};
        use actix_web::dev::Service;
        use actix_web::HttpMessage;

        let app = test::init_service(
            App::new()
                .wrap(csp_middleware(CspOptions::new().sandbox(["allow-forms"])).unwrap())
                .wrap_fn(|req, srv| {
                    req.extensions_mut()
                        .insert(Browser::new(BrowserFamily::Ie, Some(9)));
                    srv.call(req)
                })
                .route("/", web::get().to(default_handler)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(
            header_str(&res, "x-content-security-policy").as_deref(),
            Some("sandbox allow-forms")
        );
    }
}
