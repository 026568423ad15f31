use crate::commands::common::{
    connect, format_note_lines, load_palette, note_to_list_item, open_surface, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let backend = connect(global_profile).await?;
    let mut surface = open_surface(&backend).await?;
    let list = surface.list();

    if as_json {
        let json_items = list
            .notes()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if list.is_empty() {
        println!("No notes yet.");
    } else {
        for line in format_note_lines(list.rows(), load_palette()) {
            println!("{line}");
        }
    }

    surface.close();
    Ok(())
}
