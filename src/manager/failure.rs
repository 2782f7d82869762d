// ABOUTME: Classification of container launch failures.
// ABOUTME: Recognises the engine clients' file sharing denial messages.

use super::state::FailureKind;

/// Docker Desktop on Windows, when the user declines to share the drive.
const WINDOWS_SHARE_DENIED: &str = "Filesharing has been cancelled";

/// Docker Desktop on macOS, when the path is outside the shared folders.
const MACOS_SHARE_DENIED: &str = "Mounts denied";

/// Classify the text of a failed launch.
pub fn classify(detail: &str) -> FailureKind {
    if detail.contains(WINDOWS_SHARE_DENIED) || detail.contains(MACOS_SHARE_DENIED) {
        FailureKind::FileShareDenied
    } else {
        FailureKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_share_denial_is_recognised() {
        let detail = "500 Server Error: Internal Server Error (\"Filesharing has been cancelled\")";
        assert_eq!(classify(detail), FailureKind::FileShareDenied);
    }

    #[test]
    fn macos_share_denial_is_recognised() {
        let detail = "Mounts denied: \nThe path /data is not shared from the host";
        assert_eq!(classify(detail), FailureKind::FileShareDenied);
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(classify("port is already allocated"), FailureKind::Unknown);
        assert_eq!(classify(""), FailureKind::Unknown);
    }
}
