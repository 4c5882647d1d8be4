use std::{net::SocketAddr, sync::Arc, time::Duration};

use configs::{AppConfig, AuthSettings};
use service::auth::{
    password::{PasswordAlgorithm, PasswordPolicy},
    repo::seaorm::SeaOrmUserRepository,
    repository::UserRepository,
    AuthConfig,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Translate `[auth]` settings into the service configuration.
pub fn auth_config(settings: &AuthSettings) -> Result<AuthConfig, StartupError> {
    let algorithm = settings
        .password_algorithm
        .parse::<PasswordAlgorithm>()
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    Ok(AuthConfig {
        jwt_secret: settings.jwt_secret.clone(),
        token_ttl: Duration::from_secs(settings.token_ttl_secs),
        password: PasswordPolicy { algorithm, bcrypt_cost: settings.bcrypt_cost },
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

/// Public entry: connect storage, build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let auth_cfg = auth_config(&cfg.auth)?;

    // DB connection
    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.auto_migrate {
        models::db::migrate(&db).await?;
        info!("database migrations applied");
    }

    let repo: Arc<dyn UserRepository> = Arc::new(SeaOrmUserRepository::new(db));
    let state = ServerState::new(repo, auth_cfg).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    // Build router
    let app = routes::build_router(state, build_cors());

    // Bind and serve
    let addr: SocketAddr = cfg.server.bind_addr().parse()?;
    info!(%addr, token_ttl_secs = cfg.auth.token_ttl_secs, algorithm = %cfg.auth.password_algorithm, "starting auth gateway");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_settings_translate() {
        let settings = AuthSettings {
            jwt_secret: "s".into(),
            token_ttl_secs: 90,
            password_algorithm: "argon2".into(),
            bcrypt_cost: 12,
        };
        let cfg = auth_config(&settings).unwrap();
        assert_eq!(cfg.token_ttl, Duration::from_secs(90));
        assert_eq!(cfg.password.algorithm, PasswordAlgorithm::Argon2);
        assert_eq!(cfg.password.bcrypt_cost, 12);
    }

    #[test]
    fn unknown_algorithm_is_startup_error() {
        let settings = AuthSettings { jwt_secret: "s".into(), password_algorithm: "md5".into(), ..AuthSettings::default() };
        assert!(matches!(auth_config(&settings), Err(StartupError::InvalidConfig(_))));
    }
}
