//! ScanBook CLI: sign in, see which dashboard you get, upload invoices.
//!
//! Reads COGNITO_CLIENT_ID, COGNITO_REGION and SCANBOOK_API_URL from the
//! environment (or `.env`). Tokens are kept in SCANBOOK_SESSION_FILE.

use anyhow::Context;
use clap::{Parser, Subcommand};
use scanbook::client::{
    CognitoIdentityProvider, InvoiceClient, InvoiceSummary, SessionContext, UploadClient,
};
use scanbook::core::config::ClientConfig;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scanbook", about = "ScanBook invoice CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out everywhere and forget the stored session
    Logout,
    /// Show the signed-in user, role and dashboard
    Whoami,
    /// Upload an invoice file (PDF or image)
    Upload {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// List your invoices, newest first, with totals
    Invoices,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let provider = CognitoIdentityProvider::from_config(&config)
        .context("Failed to create identity provider client")?;
    let session = SessionContext::init(Arc::new(provider)).await;

    match cli.command {
        Commands::Login { email, password } => {
            // Provider messages are shown as-is
            let state = session
                .login(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            print_json(&json!({
                "userId": state.user.as_ref().map(|u| u.user_id.clone()),
                "role": state.role,
                "dashboard": state.dashboard(),
            }))?;
        }
        Commands::Logout => {
            session.logout().await.context("Remote sign-out failed")?;
            println!("Signed out");
        }
        Commands::Whoami => {
            let state = session.state();
            print_json(&json!({
                "userId": state.user.as_ref().map(|u| u.user_id.clone()),
                "username": state.user.as_ref().and_then(|u| u.username.clone()),
                "email": state.user.as_ref().and_then(|u| u.email.clone()),
                "groups": state.user.as_ref().map(|u| u.groups.clone()).unwrap_or_default(),
                "role": state.role,
                "dashboard": state.dashboard(),
            }))?;
        }
        Commands::Upload { file } => {
            let client = UploadClient::new(&config.api_url, config.upload_timeout)?;
            let response = client.upload_file(&session, &file).await?;
            print_json(&response)?;
        }
        Commands::Invoices => {
            let client = InvoiceClient::new(&config.api_url, config.auth_timeout)?;
            let invoices = client.list(&session).await?;
            let summary = InvoiceSummary::from_invoices(&invoices);
            print_json(&json!({ "invoices": invoices, "summary": summary }))?;
        }
    }

    Ok(())
}
