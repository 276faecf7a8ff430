use dotenvy::dotenv;
use research_fund_ledger::{
    config,
    core::{ledger, report},
    entities::ProfessorId,
    errors::Result,
    store::Session,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the Google OAuth access token.
const ACCESS_TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;

    // 4. Dashboard for one professor if an id was given, otherwise both
    let professors = match env::args().nth(1) {
        Some(arg) => vec![
            arg.parse::<ProfessorId>()
                .inspect_err(|e| error!("{}", e))?,
        ],
        None => ProfessorId::ALL.to_vec(),
    };

    // 5. Open the session; no token means the local store
    let token = env::var(ACCESS_TOKEN_VAR).ok();
    let session = Session::open(&app_config, token)
        .await
        .inspect_err(|e| error!("Failed to open session: {}", e))?;

    // 6. Print the dashboard
    for professor in professors {
        let totals = ledger::get_totals(&session, professor).await?;
        println!("{}", report::format_card(professor, &totals));
    }

    Ok(())
}
