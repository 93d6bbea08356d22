// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Operator CLI for the OTM repository security core
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use otm_repository_core::config::Config;
use otm_repository_core::context::build_security_manager;
use otm_repository_core::engine_core::models::{RepositoryPermission, UserPrincipal};
use otm_repository_core::engine_core::password::PasswordValidator;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Repository root (overrides OTM_REPOSITORY_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a password against a stored value
    VerifyPassword {
        /// Digest algorithm; omit for plain comparison
        #[arg(long)]
        algorithm: Option<String>,
        #[arg(long)]
        charset: Option<String>,
        password: String,
        stored: String,
    },
    /// Produce the stored {SSHA} form of a password
    EncryptPassword {
        #[arg(long, default_value = "SHA-1")]
        algorithm: String,
        password: String,
    },
    /// Resolve a user's permission on a namespace
    Authorize {
        #[arg(long)]
        user: String,
        #[arg(long)]
        namespace: String,
        #[arg(long, default_value = "READ")]
        permission: String,
    },
    /// List group names, or the groups of one user
    Groups {
        #[arg(long)]
        user: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    install_panic_hook();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(root) = cli.root {
        config.repository_root = root;
    }
    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }
    debug!(root = %config.repository_root.display(), "Configuration loaded");

    match cli.command {
        Command::VerifyPassword {
            algorithm,
            charset,
            password,
            stored,
        } => {
            let validator = PasswordValidator::new(algorithm.as_deref(), charset.as_deref())?;
            if validator.is_valid_password(&password, &stored)? {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        Command::EncryptPassword {
            algorithm,
            password,
        } => {
            let validator = PasswordValidator::new(Some(&algorithm), None)?;
            println!("{}", validator.encrypt_password(&password)?);
        }
        Command::Authorize {
            user,
            namespace,
            permission,
        } => {
            let permission: RepositoryPermission = permission.parse().map_err(|e| anyhow!("{}", e))?;
            let security = build_security_manager(&config)?;
            let groups = security.get_assigned_groups(&user)?;
            let principal = UserPrincipal::new(user, groups);

            let effective = security.get_effective_permission(&principal, &namespace)?;
            let granted = security.is_authorized(&principal, &namespace, permission);
            println!(
                "effective={} requested={} {}",
                effective,
                permission,
                if granted { "granted" } else { "denied" }
            );
            if !granted {
                std::process::exit(1);
            }
        }
        Command::Groups { user } => {
            let security = build_security_manager(&config)?;
            let names = match user {
                Some(user) => security.get_assigned_groups(&user)?,
                None => security.get_group_names()?,
            };
            for name in names {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("otm_repository_core=debug,info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().try_init().map_err(|e| anyhow!(e))?;
    } else {
        subscriber.try_init().map_err(|e| anyhow!(e))?;
    }

    Ok(())
}
