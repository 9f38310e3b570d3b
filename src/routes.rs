// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{
        auth::{auth_guard, tenant_guard},
        tenancy::TENANT_ID_HEADER,
    },
    services::upload_service::{MAX_UPLOAD_BYTES, PUBLIC_PREFIX},
};

// Folga para os cabeçalhos do multipart; o limite do arquivo é checado no serviço
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Origem CORS inválida ignorada");
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        // Sem origens configuradas: apenas a mesma origem
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static(TENANT_ID_HEADER),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
}

/// Monta o router completo: rotas públicas, rotas de usuário logado e rotas
/// da loja (token + `x-tenant-id`).
pub fn create_router(app_state: AppState) -> Router {
    // Rotas públicas (login e formulário do cliente final)
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/public/surveys/{id}", get(handlers::surveys::get_public_survey))
        .route(
            "/api/public/surveys/{id}/responses",
            post(handlers::surveys::submit_response),
        );

    // Rotas que só exigem o token (sem loja selecionada)
    let user_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::get_me))
        .route("/api/users/me/tenants", get(handlers::auth::get_my_tenants))
        .route(
            "/api/users/me/profile-picture",
            post(handlers::auth::upload_profile_picture)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/tenants",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_tenants),
        )
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let tenant_routes = Router::new()
        // Loja atual
        .route("/api/tenants/current", put(handlers::tenancy::update_current_tenant))
        .route(
            "/api/tenants/current/logo",
            post(handlers::tenancy::upload_tenant_logo)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Cargos e membros
        .route(
            "/api/roles",
            post(handlers::rbac::create_role).get(handlers::rbac::list_roles),
        )
        .route(
            "/api/users",
            post(handlers::rbac::create_member).get(handlers::rbac::list_members),
        )
        .route("/api/users/{id}", delete(handlers::rbac::remove_member))
        // Atendentes
        .route(
            "/api/atendentes",
            post(handlers::attendants::create_attendant).get(handlers::attendants::list_attendants),
        )
        .route(
            "/api/atendentes/{id}",
            get(handlers::attendants::get_attendant)
                .put(handlers::attendants::update_attendant)
                .delete(handlers::attendants::delete_attendant),
        )
        .route(
            "/api/atendentes/{id}/meta",
            get(handlers::attendants::get_goal).put(handlers::attendants::put_goal),
        )
        .route(
            "/api/atendentes/{id}/desempenho",
            get(handlers::attendants::get_performance),
        )
        .route(
            "/api/atendentes/{id}/premiacoes",
            post(handlers::attendants::award_bonus).get(handlers::attendants::list_attendant_awards),
        )
        .route("/api/premiacoes", get(handlers::attendants::list_awards))
        // Pesquisas e respostas
        .route(
            "/api/surveys",
            post(handlers::surveys::create_survey).get(handlers::surveys::list_surveys),
        )
        .route(
            "/api/surveys/{id}",
            get(handlers::surveys::get_survey)
                .put(handlers::surveys::update_survey)
                .delete(handlers::surveys::delete_survey),
        )
        .route("/api/responses", get(handlers::surveys::list_responses))
        .route("/api/responses/{id}", get(handlers::surveys::get_response))
        // Clientes
        .route("/api/clients", get(handlers::clients::list_clients))
        .route(
            "/api/clients/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route("/api/clients/{id}/cupons", get(handlers::clients::list_client_coupons))
        // Recompensas e cupons
        .route(
            "/api/recompensas",
            post(handlers::loyalty::create_reward).get(handlers::loyalty::list_rewards),
        )
        .route(
            "/api/recompensas/{id}",
            get(handlers::loyalty::get_reward)
                .put(handlers::loyalty::update_reward)
                .delete(handlers::loyalty::delete_reward),
        )
        .route(
            "/api/cupons",
            post(handlers::loyalty::issue_coupon).get(handlers::loyalty::list_coupons),
        )
        .route("/api/cupons/code/{code}", get(handlers::loyalty::get_coupon_by_code))
        .route("/api/cupons/validate", post(handlers::loyalty::validate_coupon))
        .route("/api/cupons/{id}/cancel", post(handlers::loyalty::cancel_coupon))
        .route("/api/cupons/{id}/voucher", get(handlers::loyalty::download_voucher))
        // Dashboard
        .route("/api/dashboard/summary", get(handlers::dashboard::get_summary))
        .route("/api/dashboard/nps-trend", get(handlers::dashboard::get_nps_trend))
        .route(
            "/api/dashboard/attendants",
            get(handlers::dashboard::get_attendant_ranking),
        )
        // Tratativas
        .route("/api/tratativas", get(handlers::treatments::get_board))
        .route("/api/tratativas/{id}", put(handlers::treatments::move_treatment))
        // Integrações
        .route(
            "/api/whatsapp-templates",
            post(handlers::integrations::create_template).get(handlers::integrations::list_templates),
        )
        .route(
            "/api/whatsapp-templates/{id}",
            get(handlers::integrations::get_template)
                .put(handlers::integrations::update_template)
                .delete(handlers::integrations::delete_template),
        )
        .route(
            "/api/whatsapp-templates/{id}/test",
            post(handlers::integrations::test_template),
        )
        .route(
            "/api/integrations/{provider}",
            get(handlers::integrations::get_settings).put(handlers::integrations::put_settings),
        )
        .route("/api/gmb-review", get(handlers::integrations::list_reviews))
        .route("/api/gmb-review/sync", post(handlers::integrations::sync_reviews))
        .route("/api/gmb-review/{id}/reply", put(handlers::integrations::reply_review))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let uploads = ServeDir::new(app_state.upload_service.root());

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(cors_layer(&app_state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn preflight(layer: CorsLayer, origin: &str) -> Option<HeaderValue> {
        let app: Router = Router::new().route("/api/health", get(|| async { "OK" })).layer(layer);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/health")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).cloned()
    }

    #[tokio::test]
    async fn configured_origin_is_allowed_and_garbage_is_skipped() {
        let layer = cors_layer(&["https://painel.exemplo.com".into(), "não é\norigem".into()]);
        assert_eq!(
            preflight(layer.clone(), "https://painel.exemplo.com").await,
            Some(HeaderValue::from_static("https://painel.exemplo.com"))
        );
        assert_eq!(preflight(layer, "https://outro.exemplo.com").await, None);
    }

    #[tokio::test]
    async fn no_configured_origins_means_same_origin_only() {
        assert_eq!(preflight(cors_layer(&[]), "https://painel.exemplo.com").await, None);
    }
}
