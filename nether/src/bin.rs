use std::{
    env,
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::{Context as AnyhowContext, Result};
use env_logger::Env;
use nether::{context::Context, run};
use nether_core::{config::Config, security::set_api_key};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "nether")]
struct Opt {
    /// Config file, default is ~/.nether.conf
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Synchronized folder, override `local_folder` config
    #[structopt(long, parse(from_os_str))]
    folder: Option<PathBuf>,

    #[structopt(name = "exit-after-sync", long)]
    exit_after_sync: bool,

    /// Read api key from config file if absent from keyring
    #[structopt(name = "allow-raw-keys", long)]
    allow_raw_keys: bool,

    /// Name of environment variable containing the api key
    #[structopt(name = "env-var-key", long)]
    env_var_key: Option<String>,

    /// Store used api key in keyring
    #[structopt(name = "store-key", long)]
    store_key: bool,
}

fn api_key(opt: &Opt, config: &Config) -> Result<String> {
    if let Some(api_key) = &config.api_key {
        return Ok(api_key.clone());
    }

    if let Some(env_var_key) = &opt.env_var_key {
        return env::var(env_var_key).context(format!("No env var set for name {}", env_var_key));
    }

    Ok(rpassword::prompt_password(format!(
        "Api key for {} ? ",
        config.server_url
    ))?)
}

fn main_() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    log::info!("Read config");
    let config_file_path = match &opt.config {
        Some(config_file_path) => config_file_path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::from_file(&config_file_path, opt.allow_raw_keys)?;

    let folder_path = opt
        .folder
        .clone()
        .or_else(|| config.local_folder.as_ref().map(PathBuf::from))
        .context("No folder given and no local_folder in config")?;
    let api_key = api_key(&opt, &config)?;
    if opt.store_key {
        if let Err(error) = set_api_key(&config.server_url, &whoami::username(), &api_key) {
            log::error!("Unable to store api key in keyring : {}", error);
        }
    }

    let context = Context {
        server_url: config.server_url.clone(),
        api_key,
        collection: config.collection.clone(),
        folder_path,
        upload_delay: config.upload_delay,
        poll_interval: config.poll_interval,
        timeout: config.timeout,
        exit_after_sync: opt.exit_after_sync,
    };
    log::debug!("Start with {:?}", &context);

    let stop_signal = Arc::new(AtomicBool::new(false));
    run::run(context, stop_signal)?;
    log::info!("Exit application");

    Ok(())
}

fn main() {
    if let Err(error) = main_() {
        log::error!("{:#}", error);
        std::process::exit(1);
    }
}
