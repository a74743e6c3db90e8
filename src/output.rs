use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `AGENT_MEMORY_QUIET=1` suppresses decorative human output.
/// Errors, warnings and JSON envelopes are always printed.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("AGENT_MEMORY_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
