// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        AttendantRepository, ClientRepository, DashboardRepository, IntegrationRepository, LoyaltyRepository,
        RbacRepository, SurveyRepository, TenantRepository, TreatmentRepository, UserRepository,
    },
    services::{
        attendant_service::AttendantService,
        auth::AuthService,
        client_service::ClientService,
        dashboard_service::DashboardService,
        gateways::{CloudWhatsAppGateway, GoogleMyBusinessGateway},
        integration_service::IntegrationService,
        loyalty_service::LoyaltyService,
        rbac_service::RbacService,
        seed_service::{parse_admin_emails, SeedService, DEFAULT_ADMIN_EMAILS},
        survey_service::SurveyService,
        tenancy_service::TenantService,
        treatment_service::TreatmentService,
        upload_service::UploadService,
        voucher_service::VoucherService,
    },
};

/// Configuração lida do ambiente (`.env` incluso).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub fonts_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    pub whatsapp_api_base: String,
    pub gmb_api_base: String,
    pub http_timeout_secs: u64,
    pub run_seed: bool,
    pub seed_admin_emails: Vec<String>,
    pub seed_admin_password: Option<String>,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} deve ser definida"))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválida: '{raw}'")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma fonte qualquer de variáveis.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let run_seed = parsed(&lookup, "RUN_SEED", false)?;
        let seed_admin_password = lookup("SEED_ADMIN_PASSWORD").filter(|p| !p.is_empty());
        if run_seed && seed_admin_password.is_none() {
            return Err(anyhow!("SEED_ADMIN_PASSWORD deve ser definida quando RUN_SEED=true"));
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            jwt_expiration_hours: parsed(&lookup, "JWT_EXPIRATION_HOURS", 168)?,
            server_addr: text("SERVER_ADDR", "0.0.0.0:3000"),
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            upload_dir: PathBuf::from(text("UPLOAD_DIR", "./uploads")),
            public_base_url: text("PUBLIC_BASE_URL", ""),
            fonts_dir: PathBuf::from(text("FONTS_DIR", "./fonts")),
            cors_allowed_origins: text("CORS_ALLOWED_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            whatsapp_api_base: text("WHATSAPP_API_BASE", "https://graph.facebook.com/v19.0"),
            gmb_api_base: text("GMB_API_BASE", "https://mybusiness.googleapis.com/v4"),
            http_timeout_secs: parsed(&lookup, "HTTP_TIMEOUT_SECS", 10)?,
            run_seed,
            seed_admin_emails: parse_admin_emails(&text("SEED_ADMIN_EMAILS", DEFAULT_ADMIN_EMAILS)),
            seed_admin_password,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: I18nStore,

    pub tenant_repo: TenantRepository,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub rbac_service: RbacService,
    pub attendant_service: AttendantService,
    pub survey_service: SurveyService,
    pub client_service: ClientService,
    pub loyalty_service: LoyaltyService,
    pub voucher_service: VoucherService,
    pub dashboard_service: DashboardService,
    pub treatment_service: TreatmentService,
    pub integration_service: IntegrationService,
    pub upload_service: UploadService,
    pub seed_service: SeedService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::with_pool(config, db_pool)
    }

    /// Monta o gráfico de dependências sobre uma pool já criada
    /// (os testes usam uma pool preguiçosa).
    pub fn with_pool(config: Config, db_pool: PgPool) -> anyhow::Result<Self> {
        let i18n_store = I18nStore::load_embedded()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let attendant_repo = AttendantRepository::new(db_pool.clone());
        let survey_repo = SurveyRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let loyalty_repo = LoyaltyRepository::new(db_pool.clone());
        let treatment_repo = TreatmentRepository::new(db_pool.clone());
        let integration_repo = IntegrationRepository::new(db_pool.clone());

        // --- Serviços ---
        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration_hours,
        );
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            rbac_repo.clone(),
            user_repo.clone(),
            db_pool.clone(),
        );
        let rbac_service = RbacService::new(rbac_repo, db_pool.clone());
        let attendant_service = AttendantService::new(attendant_repo.clone(), db_pool.clone());
        let client_service = ClientService::new(client_repo.clone(), db_pool.clone());
        let loyalty_service = LoyaltyService::new(loyalty_repo.clone(), client_repo.clone(), db_pool.clone());
        let survey_service = SurveyService::new(
            survey_repo,
            client_repo,
            attendant_repo,
            loyalty_repo,
            treatment_repo.clone(),
            loyalty_service.clone(),
            db_pool.clone(),
        );
        let voucher_service = VoucherService::new(loyalty_service.clone(), tenant_repo.clone(), &config.fonts_dir);
        let dashboard_service = DashboardService::new(DashboardRepository::new());
        let treatment_service = TreatmentService::new(treatment_repo, db_pool.clone());
        let integration_service = IntegrationService::new(
            integration_repo,
            Arc::new(CloudWhatsAppGateway::new(http.clone(), &config.whatsapp_api_base)),
            Arc::new(GoogleMyBusinessGateway::new(http, &config.gmb_api_base)),
        );
        let upload_service = UploadService::new(&config.upload_dir, &config.public_base_url);
        let seed_service = SeedService::new(
            rbac_service.clone(),
            tenant_service.clone(),
            tenant_repo.clone(),
            user_repo,
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            tenant_repo,
            auth_service,
            tenant_service,
            rbac_service,
            attendant_service,
            survey_service,
            client_service,
            loyalty_service,
            voucher_service,
            dashboard_service,
            treatment_service,
            integration_service,
            upload_service,
            seed_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/resto"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_expiration_hours, 168);
        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.cors_allowed_origins.is_empty());
        assert!(!config.run_seed);
        assert_eq!(config.seed_admin_emails.len(), 2);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/resto")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/resto"),
            ("JWT_SECRET", "segredo"),
            ("JWT_EXPIRATION_HOURS", "uma semana"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRATION_HOURS"));
    }

    #[test]
    fn seeding_requires_admin_password() {
        let base = [
            ("DATABASE_URL", "postgres://localhost/resto"),
            ("JWT_SECRET", "segredo"),
            ("RUN_SEED", "true"),
        ];
        assert!(Config::from_lookup(lookup(&base)).is_err());

        let mut with_password = base.to_vec();
        with_password.push(("SEED_ADMIN_PASSWORD", "troque-me"));
        with_password.push(("CORS_ALLOWED_ORIGINS", "http://localhost:5173, https://painel.exemplo.com"));
        let config = Config::from_lookup(lookup(&with_password)).unwrap();
        assert!(config.run_seed);
        assert_eq!(config.cors_allowed_origins.len(), 2);
    }
}
