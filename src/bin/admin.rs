use std::collections::VecDeque;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use cropchain_gateway::config::Config;
use cropchain_gateway::crypto::certificate_fingerprint;
use cropchain_gateway::enrollment::EnrollmentCoordinator;
use cropchain_gateway::identity::{FileSystemIdentityStore, IdentityStore};
use cropchain_gateway::ledger::{NetworkBootstrap, ProfileBootstrap};

fn print_help() {
    eprintln!(
        "\
cropchain-admin

USAGE:
  cropchain-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  enroll                          Enroll the admin and application identities
  show-identity <label>           Print a stored identity (never its private key)

COMMON OPTIONS:
  --database-url <postgres_url>    (migrate; defaults to env DATABASE_URL)
  --wallet <dir>                   (enroll, show-identity; defaults to env WALLET_PATH)

ENV (enroll):
  CONNECTION_PROFILE, CA_NAME, CA_TLS_VERIFY, CA_ADMIN_ID, CA_ADMIN_SECRET,
  APP_IDENTITY, APP_AFFILIATION
"
    );
}

fn require_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    let mut config = Config::from_env()?;

    match command.as_str() {
        "migrate" => {
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => {
                        config.database_url = require_value(&mut args, "--database-url")?;
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.database_url)
                .await?;
            cropchain_gateway::migrations::run_postgres(&pool).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "enroll" => {
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--wallet" => config.wallet_path = require_value(&mut args, "--wallet")?.into(),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let bootstrap = ProfileBootstrap::new(
                config.connection_profile.clone(),
                config.ca_name.clone(),
                config.ca_tls_verify,
                config.call_timeout,
            );
            let bindings = bootstrap.load().await?;
            let store = Arc::new(FileSystemIdentityStore::new(config.wallet_path.clone()));
            let coordinator =
                EnrollmentCoordinator::new(store, &bindings, config.enrollment_settings());

            let identity = coordinator.ensure_enrolled().await?;
            println!(
                "ok: {} enrolled for {} in {}",
                identity.label,
                identity.organization_id,
                config.wallet_path.display()
            );
            Ok(())
        }
        "show-identity" => {
            let mut label: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--wallet" => config.wallet_path = require_value(&mut args, "--wallet")?.into(),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other if label.is_none() && !other.starts_with("--") => {
                        label = Some(other.to_string());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }
            let label = label.ok_or_else(|| anyhow::anyhow!("show-identity requires <label>"))?;

            let store = FileSystemIdentityStore::new(config.wallet_path.clone());
            let Some(identity) = store.get(&label).await? else {
                anyhow::bail!("no identity stored under {label:?}");
            };

            let output = serde_json::json!({
                "label": identity.label,
                "type": identity.identity_type,
                "organizationId": identity.organization_id,
                "certificateFingerprint": certificate_fingerprint(&identity.certificate),
                "certificate": identity.certificate,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
