//! Multi-scene enhancement from a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use forge_models::registry::{GenerationParams, Param, PayloadData, format_payload};
use forge_models::{EnhancedScene, GenerationRequest, ModelProfileRegistry, ProviderId};
use serde_json::Value;
use tracing::warn;

use super::generate::{check_content, generate_options, resolve_profile};
use crate::config::ConfigLoader;
use crate::context::open_gateway;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON file holding an array of scenes ({description, camera, lighting, negative_prompt})
    pub file: PathBuf,

    /// Provider to use (overrides config)
    #[arg(short, long)]
    pub provider: Option<ProviderId>,

    /// Wrap the result in the target model's payload layout
    #[arg(long)]
    pub payload: bool,

    /// Target video model profile for --payload (overrides config)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Global generation parameter for --payload, as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sampling temperature (overrides config)
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Output token limit (overrides config)
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

pub async fn run(args: BatchArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let scenes = read_scenes(&args.file)?;
    for scene in &scenes {
        check_content(&scene.description)?;
    }

    // Resolve and correct before spending a provider call.
    let payload = if args.payload {
        let Some(profile) = resolve_profile(args.target.as_deref(), &config)? else {
            bail!("--payload needs a target model (--target or generation.target in config)");
        };
        Some((profile, correct_params(profile.id, args.params)))
    } else {
        None
    };

    let provider = args.provider.unwrap_or(config.generation.provider);
    let options = generate_options(&config, args.temperature, args.max_tokens);

    let gateway = open_gateway(&config).await?;
    let enhanced = gateway.generate_batch(provider, &scenes, options).await?;

    let output = match payload {
        Some((profile, params)) => build_payload(profile.id, enhanced, params),
        None => serde_json::to_value(&enhanced)?,
    };
    let rendered = serde_json::to_string_pretty(&output)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} scene(s) to {}", scenes.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn read_scenes(path: &Path) -> Result<Vec<GenerationRequest>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let scenes: Vec<GenerationRequest> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of scenes", path.display()))?;
    if scenes.is_empty() {
        bail!("{} contains no scenes", path.display());
    }
    Ok(scenes)
}

/// Check resolution, aspect ratio and frame rate against the target profile,
/// replacing each unsupported value with the profile's default. Other
/// parameters pass through untouched.
fn correct_params(target: &str, params: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = params.into_iter().collect();
    let requested = GenerationParams {
        resolution: params.get(Param::Resolution.as_str()).cloned(),
        aspect_ratio: params.get(Param::AspectRatio.as_str()).cloned(),
        frame_rate: params.get(Param::FrameRate.as_str()).cloned(),
    };

    let report = ModelProfileRegistry::new().validate(target, &requested);
    if report.valid {
        return params;
    }
    for violation in &report.violations {
        warn!(
            param = %violation.param,
            corrected = %violation.suggested_value,
            "{}",
            violation.message
        );
    }

    let corrected = requested.apply(&report.violations);
    let fields = [
        (Param::Resolution, corrected.resolution),
        (Param::AspectRatio, corrected.aspect_ratio),
        (Param::FrameRate, corrected.frame_rate),
    ];
    for (param, value) in fields {
        if let Some(value) = value {
            params.insert(param.as_str().to_string(), value);
        }
    }
    params
}

fn build_payload(
    target: &str,
    enhanced: Vec<EnhancedScene>,
    global_parameters: BTreeMap<String, String>,
) -> Value {
    let data = PayloadData {
        scenes: enhanced.into_iter().map(GenerationRequest::from).collect(),
        global_parameters,
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };
    format_payload(target, &data)
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
