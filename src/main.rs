//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use resto_feedback_api::{
    config::{AppState, Config},
    routes::create_router,
};

#[tokio::main]
async fn main() {
    // RUST_LOG manda; sem ele, nível info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run().await {
        tracing::error!("❌ Falha ao iniciar a aplicação: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Configuração inválida")?;
    let server_addr = config.server_addr.clone();

    let app_state = AppState::new(config)
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // O catálogo de permissões acompanha o binário
    app_state.rbac_service.sync_permission_catalogue().await?;

    if app_state.config.run_seed {
        if let Some(password) = app_state.config.seed_admin_password.as_deref() {
            app_state
                .seed_service
                .run(&app_state.config.seed_admin_emails, password)
                .await?;
        }
    }

    let app = create_router(app_state);

    let listener = TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {server_addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar o sinal de desligamento: {e}");
        // Sem sinal, o servidor segue até ser derrubado
        std::future::pending::<()>().await;
    }
    tracing::info!("Desligando o servidor...");
}
