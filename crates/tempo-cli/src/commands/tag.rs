use std::path::Path;

use serde::Serialize;

use crate::cli::TagCommands;
use crate::commands::common::{open_service, resolve_domain_id, resolve_tag};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct TagListItem {
    id: String,
    name: String,
    color: String,
    domain: Option<String>,
}

pub async fn run(command: TagCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        TagCommands::Add { name, color, domain } => {
            let (service, _, _) = open_service(db_path).await?;
            let domain_id = match domain {
                Some(name) => Some(resolve_domain_id(&service, &name).await?),
                None => None,
            };
            let tag = service.create_tag(&name, &color, domain_id).await?;
            println!("{}", tag.id);
        }
        TagCommands::List { json } => {
            let (service, _, _) = open_service(db_path).await?;
            let domains = service.list_domains().await?;
            let items: Vec<TagListItem> = service
                .list_tags()
                .await?
                .into_iter()
                .map(|tag| TagListItem {
                    id: tag.id.as_str(),
                    name: tag.name,
                    color: tag.color,
                    domain: tag.domain_id.and_then(|id| {
                        domains.iter().find(|d| d.id == id).map(|d| d.name.clone())
                    }),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    match &item.domain {
                        Some(domain) => println!("{} ({domain})  {}", item.name, item.color),
                        None => println!("{}  {}", item.name, item.color),
                    }
                }
            }
        }
        TagCommands::Delete { name } => {
            let (service, _, _) = open_service(db_path).await?;
            let tag = resolve_tag(&service, &name).await?;
            service.delete_tag(&tag.id).await?;
            println!("Deleted tag '{}'", tag.name);
        }
    }
    Ok(())
}
