use crate::config::{ConfigLoader, ForgeConfig};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
    /// Write a default config file
    Init {
        /// Write the project config instead of the user config
        #[arg(long)]
        project: bool,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { project, force } => init_config(project, force),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config:    {:?}", ConfigLoader::user_config_path());
    println!("Project config: {:?}", ConfigLoader::project_config_path());
    println!("Vault file:     {:?}", forge_paths::vault_path());
    Ok(())
}

fn init_config(project: bool, force: bool) -> Result<()> {
    let path = if project {
        ConfigLoader::project_config_path()
    } else {
        ConfigLoader::user_config_path()
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    ConfigLoader::save_to_path(&ForgeConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
