use std::path::Path;

use tempo_core::sync::{migrate_local_to_cloud, PushEngine, SharedConnectivity};
use tempo_core::SyncConfig;

use crate::commands::common::{open_service, remote_from_env};
use crate::error::CliError;
use crate::session;

/// Sign in and claim all local anonymous data for the account
pub async fn run_login(owner_id: &str, db_path: &Path) -> Result<(), CliError> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(CliError::Core(tempo_core::Error::InvalidInput(
            "owner id must not be empty".to_string(),
        )));
    }

    let (service, owner, mut stored) = open_service(db_path).await?;
    owner.set(Some(tempo_core::sync::OwnerProfile {
        id: owner_id.to_string(),
        email: None,
    }));

    let db = service.database();
    let summary = migrate_local_to_cloud(&db, owner_id).await?;

    stored.owner_id = Some(owner_id.to_string());
    session::save(db_path, &stored)?;

    println!(
        "Logged in as {owner_id}: claimed {} entit(ies) and {} queued event(s)",
        summary.entities_claimed, summary.events_claimed
    );

    // Upload the claimed data right away when a remote is configured
    match remote_from_env() {
        Ok(remote) => {
            let push = PushEngine::new(
                service.database(),
                remote,
                owner,
                SharedConnectivity::new(true),
                SyncConfig::default(),
            );
            let pushed = push.run_once().await?;
            println!(
                "Pushed {} event(s) ({} failed)",
                pushed.pushed, pushed.failed
            );
        }
        Err(CliError::SyncNotConfigured) => {
            println!("No remote configured; run `tempo sync now` once it is.");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Sign out. Local data and the outbox stay intact.
pub async fn run_logout(db_path: &Path) -> Result<(), CliError> {
    let mut stored = session::load(db_path)?;
    if stored.owner_id.is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    stored.owner_id = None;
    session::save(db_path, &stored)?;
    println!("Logged out. Local data is untouched.");
    Ok(())
}
