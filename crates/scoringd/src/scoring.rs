//! Score computation and interest lookup over the store.

use chrono::NaiveDate;
use scoring_shared::StoreError;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::Store;

/// Lifetime of a cached score
pub const SCORE_TTL: Duration = Duration::from_secs(60 * 60);

const PHONE_WEIGHT: f64 = 1.5;
const EMAIL_WEIGHT: f64 = 1.5;
const BIRTHDAY_GENDER_WEIGHT: f64 = 1.5;
const FULL_NAME_WEIGHT: f64 = 0.5;

/// Inputs of the additive score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInput<'a> {
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<i64>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Cache key for a person: `uid:` + md5 of first name, last name and
/// birthday as `YYYYMMDD`. Missing parts contribute an empty string.
pub fn score_key(first_name: Option<&str>, last_name: Option<&str>, birthday: Option<NaiveDate>) -> String {
    let birthday = birthday
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default();
    let material = format!(
        "{}{}{}",
        first_name.unwrap_or(""),
        last_name.unwrap_or(""),
        birthday
    );
    format!("uid:{:x}", md5::compute(material.as_bytes()))
}

/// Score without touching the cache
pub fn compute_score(input: &ScoreInput<'_>) -> f64 {
    let mut score = 0.0;
    if present(input.phone) {
        score += PHONE_WEIGHT;
    }
    if present(input.email) {
        score += EMAIL_WEIGHT;
    }
    if input.birthday.is_some() && input.gender.is_some() {
        score += BIRTHDAY_GENDER_WEIGHT;
    }
    if present(input.first_name) && present(input.last_name) {
        score += FULL_NAME_WEIGHT;
    }
    score
}

/// Cached score for a person.
///
/// Any existing record is a hit, including a cached zero. Read and write
/// failures degrade to a recomputation and are only logged.
pub fn get_score(store: &dyn Store, input: &ScoreInput<'_>) -> f64 {
    let key = score_key(input.first_name, input.last_name, input.birthday);

    match store.cache_get(&key) {
        Ok(Some(raw)) => match raw.trim().parse::<f64>() {
            Ok(score) if score.is_finite() && score >= 0.0 => {
                debug!("Score cache hit for {}", key);
                return score;
            }
            _ => warn!("Ignoring malformed score record {}: {:?}", key, raw),
        },
        Ok(None) => debug!("Score cache miss for {}", key),
        Err(e) => warn!("Score cache read failed for {}: {}", key, e),
    }

    let score = compute_score(input);
    if let Err(e) = store.cache_set(&key, &score.to_string(), SCORE_TTL) {
        warn!("Score cache write failed for {}: {}", key, e);
    }
    score
}

/// Interests of one client, stored as a JSON list under `i:<id>`
pub fn get_interests(store: &dyn Store, client_id: i64) -> Result<Vec<String>, StoreError> {
    let key = format!("i:{}", client_id);
    match store.get(&key)? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_slice(&raw).map_err(|e| StoreError::Malformed {
            key,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Store whose every operation fails
    struct DownStore;

    impl Store for DownStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn cache_get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn cache_set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn birthday() -> NaiveDate {
        NaiveDate::from_ymd_opt(1988, 1, 1).unwrap()
    }

    fn full_input() -> ScoreInput<'static> {
        ScoreInput {
            phone: Some("79001112233"),
            email: Some("a@b.c"),
            birthday: Some(birthday()),
            gender: Some(0),
            first_name: Some("A"),
            last_name: Some("B"),
        }
    }

    #[test]
    fn test_score_key_is_md5_of_parts() {
        assert_eq!(
            score_key(Some("A"), Some("B"), Some(birthday())),
            "uid:5dc7b1d3f69d16599a613132de460238"
        );
        assert_eq!(
            score_key(None, None, None),
            "uid:d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_compute_score_weights() {
        assert_eq!(compute_score(&full_input()), 5.0);
        assert_eq!(compute_score(&ScoreInput::default()), 0.0);

        let names_only = ScoreInput {
            first_name: Some("A"),
            last_name: Some("B"),
            ..ScoreInput::default()
        };
        assert_eq!(compute_score(&names_only), 0.5);

        let gender_zero_counts = ScoreInput {
            birthday: Some(birthday()),
            gender: Some(0),
            ..ScoreInput::default()
        };
        assert_eq!(compute_score(&gender_zero_counts), 1.5);
    }

    #[test]
    fn test_cache_hit_skips_recompute() {
        let store = MemoryStore::default();
        assert_eq!(get_score(&store, &full_input()), 5.0);

        let fewer_fields = ScoreInput {
            phone: None,
            email: None,
            ..full_input()
        };
        assert_eq!(get_score(&store, &fewer_fields), 5.0);
    }

    #[test]
    fn test_cached_zero_is_a_hit() {
        let store = MemoryStore::default();
        let key = score_key(Some("A"), Some("B"), Some(birthday()));
        store.cache_set(&key, "0", SCORE_TTL).unwrap();

        assert_eq!(get_score(&store, &full_input()), 0.0);
    }

    #[test]
    fn test_malformed_cache_record_is_a_miss() {
        let store = MemoryStore::default();
        let key = score_key(Some("A"), Some("B"), Some(birthday()));
        store.cache_set(&key, "not-a-number", SCORE_TTL).unwrap();

        assert_eq!(get_score(&store, &full_input()), 5.0);
        assert_eq!(store.cache_get(&key).unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn test_store_down_still_scores() {
        assert_eq!(get_score(&DownStore, &full_input()), 5.0);
    }

    #[test]
    fn test_interests_lookup() {
        let store = MemoryStore::default();
        store.set("i:1", br#"["books", "music"]"#).unwrap();

        assert_eq!(get_interests(&store, 1).unwrap(), vec!["books", "music"]);
        assert!(get_interests(&store, 2).unwrap().is_empty());
    }

    #[test]
    fn test_interests_errors() {
        let store = MemoryStore::default();
        store.set("i:3", b"{not json").unwrap();
        assert!(matches!(
            get_interests(&store, 3),
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            get_interests(&DownStore, 1),
            Err(StoreError::Unavailable(_))
        ));
    }
}
