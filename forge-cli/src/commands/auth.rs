//! API credential management.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use dialoguer::{Password, theme::ColorfulTheme};
use forge_models::ProviderId;
use forge_models::auth::ApiKey;

use crate::config::ConfigLoader;
use crate::context::open_gateway;

#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Store an API key for a provider
    Set {
        /// Provider (openai, anthropic, gemini)
        provider: ProviderId,

        /// Model to use (defaults to the provider's first catalog model)
        #[arg(long)]
        model: Option<String>,

        /// API key (prompted for when omitted)
        #[arg(long)]
        key: Option<String>,

        /// Store without checking the key against the provider
        #[arg(long)]
        no_validate: bool,
    },
    /// Remove a provider's stored key
    Remove {
        provider: ProviderId,
    },
    /// List providers and their configuration state
    List,
    /// Check a stored key with a live request
    Validate {
        provider: ProviderId,
    },
}

pub async fn run(args: AuthArgs) -> Result<()> {
    match args.command {
        AuthCommands::Set {
            provider,
            model,
            key,
            no_validate,
        } => set_key(provider, model, key, no_validate).await,
        AuthCommands::Remove { provider } => remove_key(provider).await,
        AuthCommands::List => list_providers().await,
        AuthCommands::Validate { provider } => validate_key(provider).await,
    }
}

async fn set_key(
    provider: ProviderId,
    model: Option<String>,
    key: Option<String>,
    no_validate: bool,
) -> Result<()> {
    let gateway = open_gateway(&ConfigLoader::load()?).await?;

    let key = match key {
        Some(key) => key,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{provider} API key"))
            .interact()?,
    };
    let key = ApiKey::new(key.trim());
    if key.is_empty() {
        bail!("API key cannot be empty");
    }

    if let Some(model) = model.as_deref()
        && let Some(info) = gateway.providers().get(provider)
        && info.catalog_model(model).is_none()
    {
        println!("Note: '{model}' is not in the {} catalog.", info.display_name);
    }

    if !no_validate {
        println!("Validating key with {provider}...");
        let check = gateway.validate_credential(provider, &key).await;
        if !check.valid {
            bail!("{}", check.message);
        }
        println!("{}", check.message);
    }

    gateway
        .set_credential(provider, key, model.as_deref())
        .await?;
    println!("Stored API key for {provider}.");
    Ok(())
}

async fn remove_key(provider: ProviderId) -> Result<()> {
    let gateway = open_gateway(&ConfigLoader::load()?).await?;

    if gateway.remove_credential(provider).await? {
        println!("Removed API key for {provider}.");
    } else {
        println!("No API key stored for {provider}.");
    }
    Ok(())
}

async fn list_providers() -> Result<()> {
    let gateway = open_gateway(&ConfigLoader::load()?).await?;
    let configured = gateway.list_configured_providers().await;
    let usage = gateway.usage_stats().await;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for info in gateway.providers().providers() {
        let status = if configured.contains(&info.id) {
            Cell::new("configured").fg(Color::Green)
        } else {
            Cell::new("not configured").fg(Color::DarkGrey)
        };
        let model = usage
            .get(&info.id)
            .map(|u| u.model.clone())
            .or_else(|| info.default_model().map(|m| format!("{} (default)", m.id)))
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(info.id),
            Cell::new(info.display_name),
            Cell::new(model),
            status,
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn validate_key(provider: ProviderId) -> Result<()> {
    let gateway = open_gateway(&ConfigLoader::load()?).await?;

    let Some(key) = gateway.stored_key(provider).await else {
        bail!("No API key configured for {provider}. Run `forge auth set {provider}` first.");
    };

    let check = gateway.validate_credential(provider, &key).await;
    if !check.valid {
        bail!("{provider}: {}", check.message);
    }
    println!("{provider}: {}", check.message);
    Ok(())
}
