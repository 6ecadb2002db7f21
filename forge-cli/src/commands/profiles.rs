//! Target video model profiles.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use forge_models::registry::{Feature, GenerationParams, validate_content};
use forge_models::{ModelProfile, ModelProfileRegistry};

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommands {
    /// List known target models
    List,
    /// Show one profile in detail
    Show {
        /// Profile id (e.g. veo, sora)
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check generation parameters (and optionally a prompt) against a profile
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Profile id
    pub id: String,

    /// Resolution, e.g. 1080p (default 1080p)
    #[arg(long)]
    pub resolution: Option<String>,

    /// Aspect ratio, e.g. 16:9 (default 16:9)
    #[arg(long)]
    pub aspect_ratio: Option<String>,

    /// Frame rate, e.g. 24 (default 24)
    #[arg(long)]
    pub fps: Option<String>,

    /// Prompt text to screen for prohibited terms
    #[arg(long)]
    pub prompt: Option<String>,
}

impl CheckArgs {
    fn params(&self) -> GenerationParams {
        let defaults = GenerationParams::project_defaults();
        GenerationParams {
            resolution: self.resolution.clone().or(defaults.resolution),
            aspect_ratio: self.aspect_ratio.clone().or(defaults.aspect_ratio),
            frame_rate: self.fps.clone().or(defaults.frame_rate),
        }
    }
}

pub fn run(args: ProfilesArgs) -> Result<()> {
    let registry = ModelProfileRegistry::new();
    match args.command {
        ProfilesCommands::List => list_profiles(&registry),
        ProfilesCommands::Show { id, json } => show_profile(lookup(&registry, &id)?, json),
        ProfilesCommands::Check(check) => check_params(&registry, &check),
    }
}

fn lookup(registry: &ModelProfileRegistry, id: &str) -> Result<&'static ModelProfile> {
    match registry.get_profile(id) {
        Some(profile) => Ok(profile),
        None => {
            let known: Vec<_> = registry.profiles().iter().map(|p| p.id).collect();
            bail!("Unknown profile '{id}'. Available: {}", known.join(", "))
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn list_profiles(registry: &ModelProfileRegistry) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Max res").fg(Color::Cyan),
        Cell::new("Negative").fg(Color::Cyan),
        Cell::new("Camera").fg(Color::Cyan),
        Cell::new("Max words").fg(Color::Cyan),
    ]);

    for profile in registry.profiles() {
        table.add_row(vec![
            Cell::new(profile.id),
            Cell::new(profile.name),
            Cell::new(profile.max_resolution),
            Cell::new(yes_no(profile.supports(Feature::NegativePrompt))),
            Cell::new(yes_no(profile.supports(Feature::CameraControls))),
            Cell::new(profile.max_prompt_length),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn show_profile(profile: &ModelProfile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("{} ({})", profile.name, profile.id);
    println!("{}", profile.description);
    println!();
    println!("  Max resolution:   {}", profile.max_resolution);
    println!("  Resolutions:      {}", profile.allowed_resolutions.join(", "));
    println!("  Aspect ratios:    {}", profile.allowed_aspect_ratios.join(", "));
    println!("  Frame rates:      {}", profile.allowed_frame_rates.join(", "));
    println!(
        "  Negative prompt:  {}",
        yes_no(profile.supports(Feature::NegativePrompt))
    );
    println!(
        "  Camera controls:  {}",
        yes_no(profile.supports(Feature::CameraControls))
    );
    println!("  Max prompt words: {}", profile.max_prompt_length);
    Ok(())
}

fn check_params(registry: &ModelProfileRegistry, args: &CheckArgs) -> Result<()> {
    let profile = lookup(registry, &args.id)?;
    let params = args.params();
    let report = registry.validate(profile.id, &params);

    let mut clean = report.valid;
    if report.valid {
        println!("Parameters are supported by {}.", profile.name);
    } else {
        for violation in &report.violations {
            println!("✗ {}", violation.message);
        }
        let corrected = params.apply(&report.violations);
        println!();
        println!("Corrected:");
        println!("  resolution   = {}", corrected.resolution.unwrap_or_default());
        println!("  aspect_ratio = {}", corrected.aspect_ratio.unwrap_or_default());
        println!("  frame_rate   = {}", corrected.frame_rate.unwrap_or_default());
    }

    if let Some(prompt) = &args.prompt {
        let content = validate_content(prompt);
        if content.safe {
            println!("Prompt passed the content check.");
        } else {
            clean = false;
            println!(
                "✗ Prompt contains prohibited terms: {}",
                content.flagged_terms.join(", ")
            );
        }
        let words = prompt.split_whitespace().count();
        if words > profile.max_prompt_length as usize {
            println!(
                "Note: prompt is {words} words; {} reads at most {}.",
                profile.name, profile.max_prompt_length
            );
        }
    }

    if !clean {
        bail!("{} check failed", profile.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: &str) -> CheckArgs {
        CheckArgs {
            id: id.to_string(),
            resolution: None,
            aspect_ratio: None,
            fps: None,
            prompt: None,
        }
    }

    #[test]
    fn unset_params_take_project_defaults() {
        let mut args = check("veo");
        args.fps = Some("30".into());

        let params = args.params();

        assert_eq!(params.resolution.as_deref(), Some("1080p"));
        assert_eq!(params.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(params.frame_rate.as_deref(), Some("30"));
    }

    #[test]
    fn defaults_pass_on_veo() {
        let registry = ModelProfileRegistry::new();
        assert!(check_params(&registry, &check("veo")).is_ok());
    }

    #[test]
    fn unsupported_value_fails_check() {
        let registry = ModelProfileRegistry::new();
        let mut args = check("veo");
        args.resolution = Some("4k".into());

        assert!(check_params(&registry, &args).is_err());
    }

    #[test]
    fn flagged_prompt_fails_check() {
        let registry = ModelProfileRegistry::new();
        let mut args = check("veo");
        args.prompt = Some("blood on the snow".into());

        assert!(check_params(&registry, &args).is_err());
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let registry = ModelProfileRegistry::new();
        let err = lookup(&registry, "pika").unwrap_err();
        assert!(err.to_string().contains("Available: veo, sora"));
    }
}
