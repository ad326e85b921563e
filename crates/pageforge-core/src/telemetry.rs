//! Tracing setup shared by `pageforge` and `pageforged`.
//!
//! Without `RUST_LOG`, Pageforge's own crates log at the requested level
//! while dependencies such as `reqwest`, `hyper` and `axum` stay at `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crate targets that follow the requested level.
const OWN_TARGETS: [&str; 3] = ["pageforge_core", "pageforged", "pageforge"];

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = String::from("warn");
    for target in OWN_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install the global subscriber. Later calls in the same process do nothing.
///
/// `json` switches to newline-delimited JSON. `RUST_LOG` overrides `level`.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json, level = %level, "tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_quiet_dependencies_and_follow_level_for_own_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,pageforge_core=debug,pageforged=debug,pageforge=debug"
        );
        assert!(default_directives(Level::INFO).contains("pageforge_core=info"));
    }

    #[test]
    fn default_directives_parse_as_a_filter() {
        for level in [Level::ERROR, Level::INFO, Level::TRACE] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }

    #[test]
    fn second_init_is_ignored() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
    }
}
