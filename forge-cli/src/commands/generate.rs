//! Single-scene prompt enhancement.

use anyhow::{Result, bail};
use clap::Args;
use forge_models::registry::validate_content;
use forge_models::{
    GenerateOptions, GenerationRequest, ModelProfile, ModelProfileRegistry, ProviderId,
};

use crate::config::{ConfigLoader, ForgeConfig};
use crate::context::{cancel_on_ctrl_c, open_gateway};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Scene description to enhance
    pub description: String,

    /// Camera direction (e.g. "slow dolly in")
    #[arg(long)]
    pub camera: Option<String>,

    /// Lighting style (e.g. "golden hour")
    #[arg(long)]
    pub lighting: Option<String>,

    /// Things the scene should avoid
    #[arg(long)]
    pub avoid: Option<String>,

    /// Provider to use (overrides config)
    #[arg(short, long)]
    pub provider: Option<ProviderId>,

    /// Target video model profile, e.g. veo or sora (overrides config)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Sampling temperature (overrides config)
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Output token limit (overrides config)
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl GenerateArgs {
    fn request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.description.trim());
        request.camera = non_blank(self.camera.as_deref());
        request.lighting = non_blank(self.lighting.as_deref());
        request.negative_prompt = non_blank(self.avoid.as_deref());
        request
    }
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let request = args.request();
    if request.description.is_empty() {
        bail!("Scene description cannot be empty");
    }
    check_content(&request.description)?;

    let provider = args.provider.unwrap_or(config.generation.provider);
    let profile = resolve_profile(args.target.as_deref(), &config)?;
    let options = generate_options(&config, args.temperature, args.max_tokens);

    let gateway = open_gateway(&config).await?;
    let prompt = gateway
        .generate(provider, &request, profile, options)
        .await?;

    println!("{prompt}");
    Ok(())
}

/// Look up the target profile named on the command line or in config.
pub(crate) fn resolve_profile(
    target: Option<&str>,
    config: &ForgeConfig,
) -> Result<Option<&'static ModelProfile>> {
    let Some(id) = target.or(config.generation.target.as_deref()) else {
        return Ok(None);
    };
    let registry = ModelProfileRegistry::new();
    match registry.get_profile(id) {
        Some(profile) => Ok(Some(profile)),
        None => {
            let known: Vec<_> = registry.profiles().iter().map(|p| p.id).collect();
            bail!("Unknown target '{id}'. Available: {}", known.join(", "))
        }
    }
}

pub(crate) fn generate_options(
    config: &ForgeConfig,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> GenerateOptions {
    GenerateOptions::default()
        .temperature(temperature.unwrap_or(config.generation.temperature))
        .max_tokens(max_tokens.unwrap_or(config.generation.max_tokens))
        .cancel(cancel_on_ctrl_c())
}

pub(crate) fn check_content(text: &str) -> Result<()> {
    let report = validate_content(text);
    if !report.safe {
        bail!(
            "Description contains prohibited terms: {}",
            report.flagged_terms.join(", ")
        );
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
