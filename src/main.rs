//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use lab_requisitions::{
    config::{AppState, Settings},
    routes,
    services::audit_service::run_alert_drain,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    // Alertas de histórico não gravado vão para o log do operador
    tokio::spawn(run_alert_drain(app_state.audit_service.subscribe()));

    let app = routes::router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
