//! Environment bootstrap for the CLI.

use log::{debug, info};
use std::path::Path;

/// Loads the first .env file found from the usual locations. Variables
/// already present in the process environment win. A missing file is not
/// an error; deployments often configure through the environment directly.
pub fn load_env() {
    let candidates = [".env", ".env.local", "../.env"];
    for path in candidates {
        if Path::new(path).exists() {
            match dotenv::from_path(path) {
                Ok(()) => {
                    info!("Loaded environment variables from {}", path);
                    return;
                }
                Err(e) => {
                    debug!("Skipping env file {}: {}", path, e);
                }
            }
        }
    }
    debug!("No .env file found, using system environment");
}
