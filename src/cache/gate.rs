//! Freshness gate for cached suggestions

use chrono::{DateTime, Duration, Utc};

use crate::suggestions::SuggestionResult;

/// Whether a new suggestion must be generated instead of reusing `prior`.
///
/// Regenerates when forced, when nothing is cached, or when the cached result
/// is older than `window`. A result exactly `window` old is still reused.
pub fn should_regenerate(
    prior: Option<&SuggestionResult>,
    now: DateTime<Utc>,
    window: Duration,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    match prior {
        None => true,
        Some(prior) => now - prior.generated_at > window,
    }
}
