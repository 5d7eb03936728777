use crate::config::{Format, GlobalConfig, load_document};
use crate::decode::{Decoder, scan_references};
use crate::hook::Resolver;
use crate::reader::SecretReader;
use crate::store::{VaultCli, VaultCliConfig};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Main CLI structure for the vault-inject application.
#[derive(Parser)]
#[command(name = "vault-inject")]
#[command(about = "Resolve {vault://...} secret references in configuration files", long_about = None)]
#[command(version)]
struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
    /// Print debug logs of the read path (never secret values)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// How to reach Vault. Flags override the global configuration.
#[derive(Args)]
struct VaultArgs {
    /// Vault server address
    #[arg(long, env = "VAULT_ADDR")]
    address: Option<String>,
    /// Path to the vault binary
    #[arg(long, env = "VAULT_INJECT_VAULT_BIN")]
    vault_bin: Option<String>,
    /// Read every reference from Vault, even fields of an already read secret
    #[arg(long, env = "VAULT_INJECT_NO_CACHE")]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a configuration file with every secret reference resolved
    Resolve {
        /// Configuration file (.toml, .json, .yaml)
        file: PathBuf,
        /// Output format, defaults to the input format
        #[arg(short, long)]
        format: Option<Format>,
        #[command(flatten)]
        vault: VaultArgs,
    },
    /// Check that every secret reference in a configuration file resolves
    Check {
        /// Configuration file (.toml, .json, .yaml)
        file: PathBuf,
        #[command(flatten)]
        vault: VaultArgs,
    },
    /// Init or show ~/.config/vault-inject/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default user configuration
    Init,
    /// Show current configuration
    Show,
}

impl VaultArgs {
    fn resolver(&self, global: &GlobalConfig) -> Resolver<VaultCli> {
        let mut config: VaultCliConfig = global.vault.clone();
        if let Some(address) = &self.address {
            config.address = Some(address.clone());
        }
        if let Some(binary) = &self.vault_bin {
            config.binary = binary.clone();
        }

        let cache_enabled = global.cache_enabled() && !self.no_cache;
        Resolver::from_reader(SecretReader::with_cache_enabled(
            VaultCli::new(config),
            cache_enabled,
        ))
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vault_inject=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Resolve {
            file,
            format,
            vault,
        } => {
            let global = GlobalConfig::load()?.unwrap_or_default();
            let document = load_document(&file)
                .wrap_err_with(|| format!("Failed to load {}", file.display()))?;
            let format = match format {
                Some(format) => format,
                None => Format::from_path(&file)?,
            };

            let decoder = Decoder::new().with_hook(vault.resolver(&global));
            let resolved = decoder
                .apply(document)
                .wrap_err_with(|| format!("Failed to resolve {}", file.display()))?;

            print!("{}", format.render(&resolved)?);
            Ok(())
        }
        Commands::Check { file, vault } => {
            let global = GlobalConfig::load()?.unwrap_or_default();
            let document = load_document(&file)
                .wrap_err_with(|| format!("Failed to load {}", file.display()))?;

            let resolver = vault.resolver(&global);
            let entries = scan_references(&document, resolver.parser());
            if entries.is_empty() {
                println!("No secret references in {}", file.display());
                return Ok(());
            }

            println!("Checking {} secret reference(s) in {}\n", entries.len(), file.display());

            let mut failed = 0;
            for entry in &entries {
                let outcome = match &entry.address {
                    Ok(address) => resolver
                        .resolve_address(address)
                        .map(|_| address.to_string())
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };

                match outcome {
                    Ok(address) => println!("{} {} -> {}", "✓".green(), entry.path, address),
                    Err(msg) => {
                        failed += 1;
                        println!("{} {} - {}", "✗".red(), entry.path, msg.red());
                    }
                }
            }

            if failed > 0 {
                return Err(eyre!(
                    "{} of {} secret reference(s) failed to resolve",
                    failed,
                    entries.len()
                ));
            }

            println!("\n{} All secret references resolve", "✓".green());
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => {
                let path = GlobalConfig::path()?;
                if path.exists() {
                    println!("Configuration already exists at {}", path.display());
                    return Ok(());
                }

                let path = GlobalConfig::default().save()?;
                println!("✓ Configuration saved to {}", path.display());
                Ok(())
            }
            ConfigAction::Show => {
                let path = GlobalConfig::path()?;
                match GlobalConfig::load()? {
                    Some(_) => {
                        println!("Configuration file: {}\n", path.display());
                        print!("{}", fs::read_to_string(&path)?);
                    }
                    None => {
                        println!("No configuration file found at {}", path.display());
                        println!("\nRun 'vault-inject config init' to create one.");
                    }
                }
                Ok(())
            }
        },
    }
}
