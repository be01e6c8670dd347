use std::path::Path;

use serde::Serialize;

use crate::cli::LogCommands;
use crate::commands::common::{open_service, today};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct LogListItem {
    id: String,
    date: String,
    reflection: String,
    highlights: Vec<String>,
}

pub async fn run(command: LogCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        LogCommands::Write {
            date,
            reflection,
            highlights,
        } => {
            let (service, _, _) = open_service(db_path).await?;
            let date = date.unwrap_or_else(today);
            let log = service.upsert_daily_log(&date, &reflection, highlights).await?;
            println!("{}", log.date);
        }
        LogCommands::Show { date } => {
            let (service, _, _) = open_service(db_path).await?;
            let date = date.unwrap_or_else(today);
            match service.get_daily_log(&date).await? {
                Some(log) => {
                    println!("{}", log.date);
                    println!("{}", log.reflection);
                    for highlight in &log.highlights {
                        println!("  * {highlight}");
                    }
                }
                None => println!("No log for {date}"),
            }
        }
        LogCommands::List { limit, json } => {
            let (service, _, _) = open_service(db_path).await?;
            let items: Vec<LogListItem> = service
                .list_daily_logs(limit)
                .await?
                .into_iter()
                .map(|log| LogListItem {
                    id: log.id.as_str(),
                    date: log.date,
                    reflection: log.reflection,
                    highlights: log.highlights,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    let first_line = item.reflection.lines().next().unwrap_or("");
                    println!("{}  {first_line}", item.date);
                }
            }
        }
    }
    Ok(())
}
