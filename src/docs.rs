// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_tenants,
        handlers::auth::upload_profile_picture,
        handlers::rbac::list_members,
        handlers::rbac::create_member,
        handlers::rbac::remove_member,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_tenants,
        handlers::tenancy::update_current_tenant,
        handlers::tenancy::upload_tenant_logo,

        // --- RBAC ---
        handlers::rbac::list_permissions,
        handlers::rbac::create_role,
        handlers::rbac::list_roles,

        // --- Attendants ---
        handlers::attendants::list_attendants,
        handlers::attendants::get_attendant,
        handlers::attendants::create_attendant,
        handlers::attendants::update_attendant,
        handlers::attendants::delete_attendant,
        handlers::attendants::get_goal,
        handlers::attendants::put_goal,
        handlers::attendants::get_performance,
        handlers::attendants::award_bonus,
        handlers::attendants::list_attendant_awards,
        handlers::attendants::list_awards,

        // --- Surveys ---
        handlers::surveys::create_survey,
        handlers::surveys::list_surveys,
        handlers::surveys::get_survey,
        handlers::surveys::update_survey,
        handlers::surveys::delete_survey,
        handlers::surveys::list_responses,
        handlers::surveys::get_response,
        handlers::surveys::get_public_survey,
        handlers::surveys::submit_response,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::clients::list_client_coupons,

        // --- Loyalty ---
        handlers::loyalty::create_reward,
        handlers::loyalty::list_rewards,
        handlers::loyalty::get_reward,
        handlers::loyalty::update_reward,
        handlers::loyalty::delete_reward,
        handlers::loyalty::list_coupons,
        handlers::loyalty::issue_coupon,
        handlers::loyalty::get_coupon_by_code,
        handlers::loyalty::validate_coupon,
        handlers::loyalty::cancel_coupon,
        handlers::loyalty::download_voucher,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_nps_trend,
        handlers::dashboard::get_attendant_ranking,

        // --- Treatments ---
        handlers::treatments::get_board,
        handlers::treatments::move_treatment,

        // --- Integrations ---
        handlers::integrations::create_template,
        handlers::integrations::list_templates,
        handlers::integrations::get_template,
        handlers::integrations::update_template,
        handlers::integrations::delete_template,
        handlers::integrations::test_template,
        handlers::integrations::get_settings,
        handlers::integrations::put_settings,
        handlers::integrations::list_reviews,
        handlers::integrations::sync_reviews,
        handlers::integrations::reply_review,
    ),
    components(
        schemas(
            crate::common::error::ErrorBody,

            // --- Auth ---
            models::auth::User,
            models::auth::UserTenant,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- TENANCY ---
            models::tenancy::Tenant,
            models::tenancy::TenantMember,
            handlers::tenancy::CreateTenantPayload,
            handlers::tenancy::UpdateTenantPayload,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::CreateRolePayload,
            models::rbac::RoleResponse,
            handlers::rbac::CreateMemberPayload,

            // --- Attendants ---
            models::attendant::GoalPeriod,
            models::attendant::Attendant,
            models::attendant::AttendantGoal,
            models::attendant::AttendantPerformance,
            models::attendant::BonusAward,
            handlers::attendants::AttendantPayload,
            handlers::attendants::GoalPayload,
            handlers::attendants::AwardPayload,

            // --- Surveys ---
            models::survey::QuestionType,
            models::survey::Question,
            models::survey::Survey,
            models::survey::PublicSurvey,
            models::survey::SurveyResponse,
            models::survey::RespondentPayload,
            models::survey::SubmitResponsePayload,
            models::survey::SubmissionReceipt,
            handlers::surveys::SurveyPayload,

            // --- Clients ---
            models::client::Client,
            models::client::ClientListEntry,
            handlers::clients::UpdateClientPayload,

            // --- Loyalty ---
            models::loyalty::RewardType,
            models::loyalty::CouponStatus,
            models::loyalty::Reward,
            models::loyalty::Coupon,
            handlers::loyalty::RewardPayload,
            handlers::loyalty::IssueCouponPayload,
            handlers::loyalty::ValidateCouponPayload,
            handlers::loyalty::CancelCouponPayload,

            // --- DASHBOARD ---
            models::dashboard::NpsBreakdown,
            models::dashboard::CsatBreakdown,
            models::dashboard::DashboardSummary,
            models::dashboard::TrendGranularity,
            models::dashboard::NpsTrendEntry,
            models::dashboard::AttendantRankingEntry,

            // --- Treatments ---
            models::treatment::TreatmentStatus,
            models::treatment::Treatment,
            models::treatment::TreatmentColumn,
            models::treatment::TreatmentBoard,
            handlers::treatments::MoveTreatmentPayload,

            // --- Integrations ---
            models::integrations::TemplateKind,
            models::integrations::WhatsAppTemplate,
            models::integrations::IntegrationProvider,
            models::integrations::IntegrationSettings,
            models::integrations::GmbReview,
            services::integration_service::TemplateTestResult,
            services::integration_service::ReviewSyncResult,
            handlers::integrations::TemplatePayload,
            handlers::integrations::TemplateTestPayload,
            handlers::integrations::SettingsPayload,
            handlers::integrations::ReplyPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Usuário logado e membros da loja"),
        (name = "Tenancy", description = "Gestão de Lojas e Acesso"),
        (name = "RBAC", description = "Controle de Acesso (Cargos e Permissões)"),
        (name = "Attendants", description = "Atendentes, metas e premiações"),
        (name = "Surveys", description = "Pesquisas de satisfação"),
        (name = "Responses", description = "Respostas recebidas"),
        (name = "Public", description = "Formulário público (sem login)"),
        (name = "Clients", description = "Clientes identificados nas respostas"),
        (name = "Loyalty", description = "Recompensas e cupons"),
        (name = "Dashboard", description = "Indicadores de NPS, CSAT e cupons"),
        (name = "Treatments", description = "Tratativas de detratores"),
        (name = "Integrations", description = "WhatsApp, Google My Business e delivery")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_bearer_scheme_and_public_routes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
        assert!(doc.paths.paths.contains_key("/api/public/surveys/{id}/responses"));
        assert!(doc.paths.paths.contains_key("/api/cupons/{id}/voucher"));
    }
}
