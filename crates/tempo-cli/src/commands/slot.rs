use std::path::Path;

use tempo_core::services::TimeSlotPatch;

use crate::cli::SlotCommands;
use crate::commands::common::{
    open_service, parse_timestamp, print_slot_lines, resolve_slot, resolve_tag_ids,
    slot_list_items,
};
use crate::error::CliError;

pub async fn run(command: SlotCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        SlotCommands::Add {
            start,
            end,
            note,
            tags,
            energy,
            mood,
        } => {
            let (service, _, _) = open_service(db_path).await?;
            let tag_ids = resolve_tag_ids(&service, &tags).await?;
            let slot = service
                .create_slot(
                    parse_timestamp(&start)?,
                    parse_timestamp(&end)?,
                    note,
                    tag_ids,
                    energy,
                    mood,
                )
                .await?;
            println!("{}", slot.id);
        }
        SlotCommands::List { limit, json } => {
            let (service, _, _) = open_service(db_path).await?;
            let slots = service.list_slots(limit).await?;
            let items = slot_list_items(&service, &slots).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_slot_lines(&items);
            }
        }
        SlotCommands::Edit {
            id,
            start,
            end,
            note,
            tags,
            energy,
            mood,
        } => {
            let (service, _, _) = open_service(db_path).await?;
            let slot = resolve_slot(&service, &id).await?;
            let tag_ids = match tags {
                Some(names) => Some(resolve_tag_ids(&service, &names).await?),
                None => None,
            };
            let patch = TimeSlotPatch {
                start_time: start.as_deref().map(parse_timestamp).transpose()?,
                end_time: end.as_deref().map(parse_timestamp).transpose()?,
                note,
                tag_ids,
                energy,
                mood,
            };
            let updated = service.update_slot(&slot.id, patch).await?;
            println!("{}", updated.id);
        }
        SlotCommands::Delete { id } => {
            let (service, _, _) = open_service(db_path).await?;
            let slot = resolve_slot(&service, &id).await?;
            service.delete_slot(&slot.id).await?;
            println!("Deleted {}", slot.id);
        }
    }
    Ok(())
}
