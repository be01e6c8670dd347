use std::path::Path;

use serde::Serialize;

use crate::cli::DomainCommands;
use crate::commands::common::{open_service, resolve_domain_id};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct DomainListItem {
    id: String,
    name: String,
    color: String,
}

pub async fn run(command: DomainCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        DomainCommands::Add { name, color } => {
            let (service, _, _) = open_service(db_path).await?;
            let domain = service.create_domain(&name, &color).await?;
            println!("{}", domain.id);
        }
        DomainCommands::List { json } => {
            let (service, _, _) = open_service(db_path).await?;
            let items: Vec<DomainListItem> = service
                .list_domains()
                .await?
                .into_iter()
                .map(|domain| DomainListItem {
                    id: domain.id.as_str(),
                    name: domain.name,
                    color: domain.color,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    println!("{}  {}", item.name, item.color);
                }
            }
        }
        DomainCommands::Delete { name } => {
            let (service, _, _) = open_service(db_path).await?;
            let id = resolve_domain_id(&service, &name).await?;
            service.delete_domain(&id).await?;
            println!("Deleted domain '{name}'");
        }
    }
    Ok(())
}
