use crate::application::ports::prompt_port::{PromptPort, QuickPickItem};
use crate::domain::groups::group_file::{GroupDefinitions, retain_selected};

pub const CANCEL_CHOICE: &str = "Cancel";

/// Narrows `defs` to everything (`all_label`) or to the groups the user picks
/// (`select_label`). None when the user cancels at either step.
pub async fn select_all_or_some<P>(
    prompt: &P,
    title: &str,
    all_label: &str,
    select_label: &str,
    mut defs: GroupDefinitions,
) -> anyhow::Result<Option<GroupDefinitions>>
where
    P: PromptPort + ?Sized,
{
    let options = vec![
        all_label.to_string(),
        select_label.to_string(),
        CANCEL_CHOICE.to_string(),
    ];
    let choice = prompt.prompt_choice(title, &options).await?;
    match choice.as_deref() {
        Some(c) if c == all_label => Ok(Some(defs)),
        Some(c) if c == select_label => {
            let items: Vec<QuickPickItem> = defs
                .keys()
                .map(|name| QuickPickItem::plain(name.clone()))
                .collect();
            let Some(picked) = prompt.prompt_multi_select(title, &items).await? else {
                return Ok(None);
            };
            let selected: Vec<String> = picked.into_iter().map(|item| item.key).collect();
            retain_selected(&mut defs, &selected);
            Ok(Some(defs))
        }
        _ => Ok(None),
    }
}
