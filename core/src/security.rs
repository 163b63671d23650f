extern crate keyring;

use std::error::Error;

fn service(server_url: &str) -> String {
    format!("nether::{}", server_url)
}

pub fn get_api_key(server_url: &str, username: &str) -> Result<String, Box<dyn Error>> {
    let service = service(server_url);
    let entry = keyring::Entry::new(&service, username);
    log::info!(
        "Get api key for service '{}' and user '{}'",
        &service,
        &username
    );
    Ok(entry.get_password()?)
}

pub fn set_api_key(server_url: &str, username: &str, api_key: &str) -> Result<(), Box<dyn Error>> {
    let service = service(server_url);
    let entry = keyring::Entry::new(&service, username);
    log::info!(
        "Store api key for service '{}' and user '{}'",
        &service,
        &username
    );
    entry.set_password(api_key)?;
    Ok(())
}
