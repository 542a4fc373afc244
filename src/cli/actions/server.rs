use crate::{
    api,
    api::handlers::auth::AuthConfig,
    cli::{actions::Action, globals::GlobalArgs},
};
use anyhow::Result;

/// Handle the server action
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            server_id,
            otp_issuer,
            frontend_url,
            protect_info,
            protect_logs,
        } => {
            let config = AuthConfig::new(frontend_url)
                .with_server_id(server_id)
                .with_otp_issuer(otp_issuer)
                .with_protect_info(protect_info)
                .with_protect_logs(protect_logs);

            api::new(port, dsn, globals, config).await?;
        }
    }

    Ok(())
}
