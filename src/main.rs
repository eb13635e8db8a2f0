//! QuickVault - CLI
//!
//! Command-line surface over the core, for development and demos. Runs
//! against the file-backed secret and record stores; a real app plugs in the
//! platform keychain and its own database through the same traits.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use quickvault_core::auth::{AuthConfig, Authenticator};
use quickvault_core::biometrics::UnavailableGate;
use quickvault_core::crypto::CryptoEngine;
use quickvault_core::records::{FileRecordStore, RecordField, RecordId, RecordStore};
use quickvault_core::secrets::{FileSecretStore, SecretStore};

#[derive(Parser)]
#[command(name = "quickvault")]
#[command(version = quickvault_core::VERSION)]
#[command(about = "QuickVault - encrypted personal data vault")]
struct Cli {
    /// Vault directory (defaults to the platform data dir)
    #[arg(short, long)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show provisioning status
    Status,

    /// Set up the master password
    Setup,

    /// Verify the master password unlocks the vault
    Verify,

    /// Change the master password (re-encrypts every record)
    ChangePassword,

    /// Permanently delete all records and credentials
    Wipe,

    /// Add an encrypted note
    Add {
        /// Note text
        text: String,
    },

    /// Decrypt and print a note
    Show {
        /// Record id
        id: String,
    },

    /// List record ids
    List,
}

struct Vault {
    auth: Authenticator,
    records: Arc<FileRecordStore>,
    crypto: Arc<CryptoEngine>,
}

fn open_vault(dir: &PathBuf) -> Vault {
    let secrets = Arc::new(FileSecretStore::new(dir.join("secrets")));
    let records = Arc::new(FileRecordStore::new(dir.join("store")));
    let crypto = Arc::new(CryptoEngine::new(secrets.clone() as Arc<dyn SecretStore>));
    let auth = Authenticator::new(
        crypto.clone(),
        secrets as Arc<dyn SecretStore>,
        records.clone() as Arc<dyn RecordStore>,
        Arc::new(UnavailableGate),
        AuthConfig::default(),
    );
    Vault {
        auth,
        records,
        crypto,
    }
}

fn default_vault_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("could not determine the platform data directory")?;
    Ok(base.join("quickvault"))
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(password)
}

fn prompt_new_password() -> Result<String> {
    let first = rpassword::prompt_password("New master password: ")?;
    let second = rpassword::prompt_password("Confirm password: ")?;
    if first != second {
        bail!("passwords do not match");
    }
    Ok(first)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let vault_dir = match cli.vault {
        Some(dir) => dir,
        None => default_vault_dir()?,
    };
    let vault = open_vault(&vault_dir);

    match cli.command {
        Commands::Status => {
            println!("Vault directory:   {}", vault_dir.display());
            println!("State:             {:?}", vault.auth.state());
            println!("Salt provisioned:  {}", vault.crypto.has_salt());
            println!("Biometric enabled: {}", vault.auth.is_biometric_enabled());
            println!("Records:           {}", vault.records.count()?);
        }

        Commands::Setup => {
            let password = prompt_new_password()?;
            vault.auth.setup_master_password(&password).await?;
            println!("Vault ready.");
        }

        Commands::Verify => {
            let password = prompt_password("Master password: ")?;
            vault.auth.authenticate_with_password(&password).await?;
            println!("Unlocked.");
        }

        Commands::ChangePassword => {
            let old = prompt_password("Current password: ")?;
            let new = prompt_new_password()?;
            let report = vault.auth.change_password(&old, &new).await?;
            println!(
                "Password changed. Re-encrypted {} blobs and {} files across {} records.",
                report.blobs, report.files, report.records
            );
        }

        Commands::Wipe => {
            println!("This permanently deletes every record and credential.");
            println!("Type 'wipe' to continue:");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            if line.trim() != "wipe" {
                bail!("aborted");
            }

            let password = prompt_password("Master password: ")?;
            vault.auth.clear_all_data(&password).await?;
            println!("Vault wiped.");
        }

        Commands::Add { text } => {
            let password = prompt_password("Master password: ")?;
            vault.auth.authenticate_with_password(&password).await?;

            let ciphertext = vault.auth.encrypt(&text).await?;
            let id = vault
                .records
                .insert_record(vec![(RecordField::Text, ciphertext)])?;
            println!("{}", id);
        }

        Commands::Show { id } => {
            let id: RecordId = id.parse().context("invalid record id")?;
            let password = prompt_password("Master password: ")?;
            vault.auth.authenticate_with_password(&password).await?;

            let ciphertext = vault.records.read_ciphertext(id, RecordField::Text)?;
            println!("{}", vault.auth.decrypt(&ciphertext).await?);
        }

        Commands::List => {
            let handles = vault.records.fetch_all()?;
            if handles.is_empty() {
                println!("No records.");
            } else {
                for handle in handles {
                    let fields: Vec<&str> =
                        handle.fields.iter().map(|field| field.as_str()).collect();
                    println!("{}  [{}]", handle.id, fields.join(", "));
                }
            }
        }
    }

    Ok(())
}
