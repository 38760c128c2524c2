//! Geographic resolution
//!
//! Given the raw origin/destination strings a sender typed, produce
//! `{city, state, state_code, confidence}`. Resolution is table-driven and
//! deterministic; the resolver is a trait so the emitter can be wired with
//! a fake in tests.

mod states;

pub use states::{state_centroid, state_info, StateInfo, CITIES, STATES};

/// A resolved location
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// Matched city, when the input named one
    pub city: Option<String>,
    /// Canonical state name
    pub state: String,
    /// ISO 3166-2 state code
    pub state_code: String,
    /// Resolution confidence in `[0, 1]`
    pub confidence: f64,
}

/// Resolves raw location strings to states
pub trait GeoResolver: Send + Sync {
    /// Resolve a raw location string. `None` when nothing matched.
    fn resolve(&self, raw: &str) -> Option<ResolvedLocation>;
}

/// Deterministic resolver over the static city/state tables
///
/// Confidence ladder: exact city 0.95, exact state 0.75, substring 0.6.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticGeoResolver;

impl GeoResolver for StaticGeoResolver {
    fn resolve(&self, raw: &str) -> Option<ResolvedLocation> {
        let query = raw.trim();
        if query.is_empty() {
            return None;
        }

        // Exact city match
        for (city, state) in CITIES {
            if city.eq_ignore_ascii_case(query) {
                let info = state_info(state)?;
                return Some(ResolvedLocation {
                    city: Some((*city).to_string()),
                    state: info.name.to_string(),
                    state_code: info.iso_code.to_string(),
                    confidence: 0.95,
                });
            }
        }

        // Exact state match
        if let Some(info) = state_info(query) {
            return Some(ResolvedLocation {
                city: None,
                state: info.name.to_string(),
                state_code: info.iso_code.to_string(),
                confidence: 0.75,
            });
        }

        // Fuzzy: "Mumbai Port", "Navi Mumbai"
        let lowered = query.to_ascii_lowercase();
        for (city, state) in CITIES {
            let city_lower = city.to_ascii_lowercase();
            if lowered.contains(&city_lower) || city_lower.contains(&lowered) {
                let info = state_info(state)?;
                return Some(ResolvedLocation {
                    city: Some((*city).to_string()),
                    state: info.name.to_string(),
                    state_code: info.iso_code.to_string(),
                    confidence: 0.6,
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_city_match() {
        let resolved = StaticGeoResolver.resolve("Mumbai").unwrap();
        assert_eq!(resolved.city.as_deref(), Some("Mumbai"));
        assert_eq!(resolved.state, "Maharashtra");
        assert_eq!(resolved.state_code, "IN-MH");
        assert_eq!(resolved.confidence, 0.95);
    }

    #[test]
    fn test_exact_state_match() {
        let resolved = StaticGeoResolver.resolve("gujarat").unwrap();
        assert_eq!(resolved.city, None);
        assert_eq!(resolved.state, "Gujarat");
        assert_eq!(resolved.confidence, 0.75);
    }

    #[test]
    fn test_fuzzy_match() {
        let resolved = StaticGeoResolver.resolve("Navi Mumbai").unwrap();
        assert_eq!(resolved.state, "Maharashtra");
        assert_eq!(resolved.confidence, 0.6);
    }

    #[test]
    fn test_unresolvable_input() {
        assert!(StaticGeoResolver.resolve("Atlantis").is_none());
        assert!(StaticGeoResolver.resolve("   ").is_none());
    }

    #[test]
    fn test_every_city_has_a_state_row() {
        for (_, state) in CITIES {
            assert!(state_info(state).is_some(), "missing state row: {}", state);
        }
    }
}
