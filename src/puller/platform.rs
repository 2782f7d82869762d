// ABOUTME: Host environment fix-ups needed before the engine is first used.
// ABOUTME: On macOS the Docker Desktop helper binaries are added to PATH.

/// Where Docker Desktop keeps its credential and CLI helpers on macOS.
pub const DOCKER_DESKTOP_BIN: &str = "/Applications/Docker.app/Contents/Resources/bin/";

/// The PATH value with the Docker Desktop helpers prepended, or `None` if
/// they are already on it.
pub fn helper_search_path(current: Option<&str>) -> Option<String> {
    let helpers = DOCKER_DESKTOP_BIN.trim_end_matches('/');
    match current {
        Some(path) if path.split(':').any(|p| p.trim_end_matches('/') == helpers) => None,
        Some(path) if !path.is_empty() => Some(format!("{}:{}", DOCKER_DESKTOP_BIN, path)),
        _ => Some(DOCKER_DESKTOP_BIN.to_string()),
    }
}

/// Apply the one-time PATH fix-up on macOS. Does nothing elsewhere.
///
/// # Safety
///
/// Modifies the process environment, so it must run before any other
/// thread is started (in particular before the async runtime is built).
pub unsafe fn prepare_host_environment() {
    if !cfg!(target_os = "macos") {
        return;
    }

    let current = std::env::var("PATH").ok();
    if let Some(path) = helper_search_path(current.as_deref()) {
        tracing::debug!(path = %path, "adding engine helpers to PATH");
        // SAFETY: the caller guarantees no other threads are running.
        unsafe { std::env::set_var("PATH", path) };
    }
}
