use std::time::Duration;

/// Poll `connect` until it succeeds, sleeping `poll_interval_ms` between
/// attempts. There is no upper bound: callers use this for peers that are
/// guaranteed to appear eventually (e.g. a region file created by the host).
pub fn wait_for_resource<F, T, E>(mut connect: F, poll_interval_ms: u64, resource_name: &str) -> T
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempts = 0u64;
    loop {
        match connect() {
            Ok(resource) => {
                tracing::info!(attempts, "{} connected", resource_name);
                return resource;
            }
            Err(e) => {
                attempts += 1;
                tracing::debug!("Waiting for {} ({})", resource_name, e);
                std::thread::sleep(Duration::from_millis(poll_interval_ms));
            }
        }
    }
}
