use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::application::services::group_repository::{
    IMPORT_MERGE, IMPORT_OVERWRITE, IMPORT_SKIP, ImportReport,
};
use crate::application::use_cases::groups::add_addons_via_picker::AddAddonsViaPicker;
use crate::application::use_cases::groups::create_group::CreateGroup;
use crate::application::use_cases::groups::drop_addons_on_group::DropAddonsOnGroup;
use crate::application::use_cases::groups::export_groups::{EXPORT_ALL, ExportGroups};
use crate::application::use_cases::groups::import_groups_from_file::{
    IMPORT_ALL, ImportGroupsFromFile,
};
use crate::application::use_cases::groups::remove_addon_from_group::RemoveAddonFromGroup;
use crate::application::use_cases::groups::remove_group::RemoveGroup;
use crate::application::use_cases::groups::rename_group::RenameGroup;
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::infrastructure::prompt::{AutoPrompt, TerminalPrompt};
use crate::presentation::tree::{TreeNode, group_tree, installed_tree};

#[derive(Parser, Debug)]
#[command(
    name = "addon-groups",
    version,
    about = "Organize installed editor add-ons into named groups"
)]
pub struct Cli {
    /// Ask on the terminal instead of using flags and defaults
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// Overrides ADDON_GROUPS_STATE_FILE
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Overrides ADDON_GROUPS_EXTENSIONS_DIR
    #[arg(long, global = true)]
    pub extensions_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(path) = &self.state_file {
            cfg.state_file = path.clone();
        }
        if let Some(dir) = &self.extensions_dir {
            cfg.extensions_dir = dir.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show groups and their installed members
    List {
        /// Show every installed add-on instead
        #[arg(long)]
        installed: bool,
    },
    Create {
        name: Option<String>,
    },
    Rename {
        name: String,
        new_name: Option<String>,
    },
    Remove {
        name: String,
    },
    /// Add installed add-ons to a group; without ids, pick from a list
    Add {
        group: String,
        addon_ids: Vec<String>,
    },
    RemoveMember {
        group: String,
        addon_id: String,
    },
    Export {
        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Import {
        file: Option<PathBuf>,
        /// How to resolve a name that already exists
        #[arg(long, value_enum, default_value_t = ConflictPolicy::Skip)]
        on_conflict: ConflictPolicy,
    },
    /// Keep groups in step with the extensions directory until interrupted
    Watch {
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    Overwrite,
    Merge,
}

impl ConflictPolicy {
    pub fn choice(self) -> &'static str {
        match self {
            ConflictPolicy::Skip => IMPORT_SKIP,
            ConflictPolicy::Overwrite => IMPORT_OVERWRITE,
            ConflictPolicy::Merge => IMPORT_MERGE,
        }
    }
}

pub async fn run(cli: Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let terminal = TerminalPrompt::stdio();
    let repo = ctx.repo();

    match cli.command {
        Command::List { installed } => {
            let nodes = if installed {
                installed_tree(ctx.inventory().as_ref())
            } else {
                group_tree(&repo).await
            };
            print!("{}", render_tree(&nodes));
        }
        Command::Create { name } => {
            let created = match name {
                Some(name) => repo.create_group(&name).await?.then_some(name),
                None => {
                    CreateGroup {
                        repo: &repo,
                        prompt: &terminal,
                    }
                    .execute()
                    .await?
                }
            };
            match created {
                Some(name) => println!("Created group \"{name}\""),
                None => println!("No group created"),
            }
        }
        Command::Rename { name, new_name } => {
            let renamed = match new_name {
                Some(new_name) => repo.rename_group(&name, &new_name).await?,
                None => {
                    RenameGroup {
                        repo: &repo,
                        prompt: &terminal,
                    }
                    .execute(&name)
                    .await?
                }
            };
            if !renamed {
                println!("Group \"{name}\" was not renamed");
            }
        }
        Command::Remove { name } => {
            let removed = RemoveGroup { repo: &repo }.execute(&name).await?;
            if !removed {
                println!("No group named \"{name}\"");
            }
        }
        Command::Add { group, addon_ids } => {
            if repo.get_group(&group).await.is_none() {
                anyhow::bail!("no group named \"{group}\"");
            }
            let added = if addon_ids.is_empty() {
                AddAddonsViaPicker {
                    repo: &repo,
                    prompt: &terminal,
                }
                .execute(&group)
                .await?
                .unwrap_or_default()
            } else {
                DropAddonsOnGroup { repo: &repo }
                    .execute(&group, &addon_ids)
                    .await?
            };
            println!("Added {} add-on(s) to \"{group}\"", added.len());
        }
        Command::RemoveMember { group, addon_id } => {
            let removed = RemoveAddonFromGroup { repo: &repo }
                .execute(&group, &addon_id)
                .await?;
            if !removed {
                println!("\"{addon_id}\" is not in \"{group}\"");
            }
        }
        Command::Export { output } => {
            let exported = if cli.interactive {
                ExportGroups {
                    repo: &repo,
                    prompt: &terminal,
                }
                .execute()
                .await?
            } else {
                let mut prompt = AutoPrompt::new().prefer(EXPORT_ALL);
                if let Some(output) = output {
                    prompt = prompt.save_path(output);
                }
                ExportGroups {
                    repo: &repo,
                    prompt: &prompt,
                }
                .execute()
                .await?
            };
            if let Some(count) = exported {
                println!("Exported {count} group(s)");
            }
        }
        Command::Import { file, on_conflict } => {
            let report = match file {
                Some(file) if !cli.interactive => {
                    let prompt = AutoPrompt::new()
                        .prefer(IMPORT_ALL)
                        .prefer(on_conflict.choice())
                        .open_path(file);
                    ImportGroupsFromFile {
                        repo: &repo,
                        prompt: &prompt,
                    }
                    .execute()
                    .await?
                }
                _ => {
                    ImportGroupsFromFile {
                        repo: &repo,
                        prompt: &terminal,
                    }
                    .execute()
                    .await?
                }
            };
            if let Some(report) = report {
                print!("{}", render_report(&report));
            }
        }
        Command::Watch { poll_secs } => watch(ctx, Duration::from_secs(poll_secs.max(1))).await?,
    }
    Ok(())
}

async fn watch(ctx: &AppContext, poll: Duration) -> anyhow::Result<()> {
    let listener = ctx.sync().spawn_listener();
    let inventory = ctx.inventory();
    tracing::info!(
        root = %inventory.root().display(),
        poll_secs = poll.as_secs(),
        "watching_extensions_dir"
    );

    let mut ticker = tokio::time::interval(poll);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if let Err(e) = inventory.refresh().await {
                    tracing::warn!(error = ?e, "extensions_dir_refresh_failed");
                }
            }
        }
    }
    listener.abort();
    Ok(())
}

pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&format!("{}\n", node_line(node)));
        for child in node.children() {
            out.push_str(&format!("  {}\n", node_line(&child)));
        }
    }
    out
}

fn node_line(node: &TreeNode) -> String {
    match node {
        TreeNode::Group { name, members } => format!("{name} ({})", members.len()),
        TreeNode::Addon { addon, .. } if addon.label() != addon.id => {
            format!("{} [{}]", addon.label(), addon.id)
        }
        TreeNode::Addon { addon, .. } => addon.id.clone(),
    }
}

pub fn render_report(report: &ImportReport) -> String {
    let mut out = String::new();
    let sections = [
        ("Imported", &report.imported),
        ("Skipped", &report.skipped),
        ("Install requested", &report.install_requested),
        ("Install declined", &report.install_declined),
    ];
    for (title, items) in sections {
        if !items.is_empty() {
            out.push_str(&format!("{title}: {}\n", items.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::groups::addon::AddonRef;
    use crate::domain::groups::group::Group;
    use tempfile::TempDir;

    #[test]
    fn parses_import_flags() {
        let cli = Cli::try_parse_from([
            "addon-groups",
            "import",
            "groups.json",
            "--on-conflict",
            "merge",
        ])
        .unwrap();
        match cli.command {
            Command::Import { file, on_conflict } => {
                assert_eq!(file, Some(PathBuf::from("groups.json")));
                assert_eq!(on_conflict.choice(), IMPORT_MERGE);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.interactive);
    }

    #[test]
    fn global_overrides_replace_config_paths() {
        let cli = Cli::try_parse_from([
            "addon-groups",
            "list",
            "--state-file",
            "/tmp/state.json",
        ])
        .unwrap();
        let mut cfg = Config {
            state_file: "default.json".into(),
            extensions_dir: "ext".into(),
            builtin_prefix: "vscode.".into(),
            install_command: None,
            install_wait_ttl_secs: None,
        };
        cli.apply_overrides(&mut cfg);
        assert_eq!(cfg.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(cfg.extensions_dir, PathBuf::from("ext"));
    }

    #[test]
    fn renders_groups_with_members() {
        let nodes = vec![TreeNode::Group {
            name: "Work".into(),
            members: vec![AddonRef::new("acme.fmt", "Formatter"), AddonRef::new("b", "b")],
        }];
        assert_eq!(render_tree(&nodes), "Work (2)\n  Formatter [acme.fmt]\n  b\n");
    }

    #[test]
    fn report_lists_non_empty_sections() {
        let report = ImportReport {
            imported: vec!["Work".into()],
            install_declined: vec!["x".into()],
            ..Default::default()
        };
        assert_eq!(render_report(&report), "Imported: Work\nInstall declined: x\n");
    }

    #[tokio::test]
    async fn remove_commands_update_the_state_file() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            state_file: temp.path().join("state.json"),
            extensions_dir: temp.path().join("extensions"),
            builtin_prefix: "vscode.".into(),
            install_command: None,
            install_wait_ttl_secs: None,
        };
        let ctx = AppContext::from_config(cfg).unwrap();
        let repo = ctx.repo();
        repo.update_group(Group::create("Work", ["acme.fmt", "acme.lint"]))
            .await
            .unwrap();

        let cli =
            Cli::try_parse_from(["addon-groups", "remove-member", "Work", "acme.fmt"]).unwrap();
        run(cli, &ctx).await.unwrap();
        assert_eq!(repo.get_group("Work").await.unwrap().member_ids(), ["acme.lint"]);

        let cli = Cli::try_parse_from(["addon-groups", "remove", "Work"]).unwrap();
        run(cli, &ctx).await.unwrap();
        assert!(repo.group_names().await.is_empty());

        let cli = Cli::try_parse_from(["addon-groups", "remove", "Work"]).unwrap();
        run(cli, &ctx).await.unwrap();
    }
}
