// Storefront monitor: one monitoring run per process.
//
// Prints the HTTP-shaped JSON response to stdout. Logs go to stderr so the
// host runtime can capture them separately. Exit code is 0 only on HTTP 200.

use std::sync::Arc;

use storefront_monitor::report::early_failure;
use storefront_monitor::{
    AppwriteStorage, ChromeLauncher, InvocationContext, InvocationResponse, ObjectStorage,
    Settings, browser_setup, debug_mode_from_env, load_yaml_config, run_invocation,
};
use storefront_monitor::utils::MonitorError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let include_stack = debug_mode_from_env();
    let response = invoke(include_stack).await;

    println!("{}", response.to_json_pretty());

    std::process::exit(if response.is_success() { 0 } else { 1 });
}

async fn invoke(include_stack: bool) -> InvocationResponse {
    let mut config = match load_yaml_config() {
        Ok(config) => config,
        Err(e) => {
            return early_failure(&MonitorError::Configuration(format!("{e:#}")), include_stack);
        }
    };

    let settings = Settings::from_env();

    // Provisioning check; a failed launch reports the definitive error
    if let Ok(settings) = &settings {
        let override_path = config
            .browser
            .executable_path
            .clone()
            .or_else(|| settings.chromium_path.clone());
        match browser_setup::resolve_executable(override_path.as_deref()) {
            Ok(path) => config.browser.executable_path = Some(path),
            Err(e) => warn!("Browser provisioning check failed: {e:#}"),
        }
    }

    let ctx = InvocationContext::new(&config.target.url, include_stack);
    run_invocation(
        &ctx,
        &config,
        settings,
        Arc::new(ChromeLauncher),
        |storage_settings| {
            let storage: Arc<dyn ObjectStorage> = Arc::new(AppwriteStorage::new(storage_settings)?);
            Ok(storage)
        },
    )
    .await
}
