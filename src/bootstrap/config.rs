use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub state_file: PathBuf,
    pub extensions_dir: PathBuf,
    pub builtin_prefix: String,
    pub install_command: Option<String>,
    pub install_wait_ttl_secs: Option<i64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let state_file = env::var("ADDON_GROUPS_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./addon-groups-state.json"));
        let extensions_dir = env::var("ADDON_GROUPS_EXTENSIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_extensions_dir());
        let builtin_prefix =
            env::var("ADDON_GROUPS_BUILTIN_PREFIX").unwrap_or_else(|_| "vscode.".into());
        // An explicitly empty command disables installs
        let install_command = match env::var("ADDON_GROUPS_INSTALL_CMD") {
            Ok(cmd) if cmd.trim().is_empty() => None,
            Ok(cmd) => Some(cmd),
            Err(_) => Some("code --install-extension {id}".into()),
        };
        let install_wait_ttl_secs = match env::var("ADDON_GROUPS_INSTALL_WAIT_TTL_SECS") {
            Ok(raw) => {
                let secs: i64 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!(
                        "ADDON_GROUPS_INSTALL_WAIT_TTL_SECS must be a whole number of seconds"
                    )
                })?;
                if secs <= 0 { None } else { Some(secs) }
            }
            Err(_) => None,
        };

        if let Some(cmd) = &install_command {
            if !cmd.contains("{id}") {
                anyhow::bail!("ADDON_GROUPS_INSTALL_CMD must contain an {{id}} placeholder");
            }
        }

        Ok(Self {
            state_file,
            extensions_dir,
            builtin_prefix,
            install_command,
            install_wait_ttl_secs,
        })
    }

    pub fn install_wait_ttl(&self) -> Option<chrono::Duration> {
        self.install_wait_ttl_secs.map(chrono::Duration::seconds)
    }
}

fn default_extensions_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join(".vscode").join("extensions"),
        _ => PathBuf::from("./extensions"),
    }
}
