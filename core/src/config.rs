use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use ini::Ini;

use crate::{client::DEFAULT_CLIENT_TIMEOUT, security::get_api_key, utils::strbool};

pub const DEFAULT_UPLOAD_DELAY: u64 = 10;
pub const DEFAULT_POLL_INTERVAL: u64 = 10;

#[derive(Clone)]
pub struct Config {
    pub server_url: String,
    pub collection: String,
    pub local_folder: Option<String>,
    /// Quiet period after the last local edit before upload
    pub upload_delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub api_key: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let user_home_folder_path = dirs::home_dir().context("Unable to determine home folder")?;
        if cfg!(target_os = "windows") {
            return Ok(user_home_folder_path
                .join("AppData")
                .join("Local")
                .join("nether.conf"));
        }

        Ok(user_home_folder_path.join(".nether.conf"))
    }

    pub fn from_file(config_file_path: &PathBuf, allow_raw_keys: bool) -> Result<Self> {
        let config_ini = Ini::load_from_file(config_file_path).context(format!(
            "Error when loading config file at '{}'",
            config_file_path.display()
        ))?;
        Self::from_ini(config_ini, allow_raw_keys)
    }

    pub fn from_ini(config_ini: Ini, allow_raw_keys: bool) -> Result<Self> {
        let os_username = whoami::username();
        let server = config_ini
            .section(Some("server"))
            .context("Missing \"server\" section in config")?;

        let server_url = server
            .get("url")
            .context("Unable to read url config from server section")?
            .to_string();
        let collection = server
            .get("collection")
            .context("Unable to read collection config from server section")?
            .to_string();
        let local_folder = server.get("local_folder").map(|v| v.to_string());
        let upload_delay = seconds(server.get("upload_delay"), DEFAULT_UPLOAD_DELAY)
            .context("Unable to read upload_delay config from server section")?;
        let poll_interval = seconds(server.get("poll_interval"), DEFAULT_POLL_INTERVAL)
            .context("Unable to read poll_interval config from server section")?;
        let timeout = seconds(server.get("timeout"), DEFAULT_CLIENT_TIMEOUT)
            .context("Unable to read timeout config from server section")?;
        let allow_raw_keys = allow_raw_keys || strbool(server.get("allow_raw_keys").unwrap_or("0"));

        // try to get api key from keyring
        let api_key = match get_api_key(&server_url, &os_username) {
            Ok(api_key) => Some(api_key),
            Err(error) => {
                if allow_raw_keys {
                    server.get("api_key").map(|v| v.to_string())
                } else {
                    log::info!(
                        "Unable to read api key from keyring for '{}' and user '{os_username}' : '{}'",
                        &server_url,
                        error,
                    );
                    None
                }
            }
        };

        Ok(Self {
            server_url,
            collection,
            local_folder,
            upload_delay,
            poll_interval,
            timeout,
            api_key,
        })
    }
}

fn seconds(value: Option<&str>, default: u64) -> Result<Duration> {
    let value = match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .context(format!("'{}' is not a number of seconds", value))?,
        None => default,
    };

    if value == 0 {
        anyhow::bail!("Duration must be at least one second")
    }

    Ok(Duration::from_secs(value))
}
