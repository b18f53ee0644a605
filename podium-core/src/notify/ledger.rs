use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;

use crate::model::UserId;

/// Identity of one proactive message. Each key is delivered at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// "Starts soon" for one report.
    Start { user: UserId, url: String },
    /// "Please rate" after one report ended.
    End { user: UserId, url: String },
    /// Digest of unrated reports of one conference day.
    Day { user: UserId, day: NaiveDate },
    /// Digest after the conference is over.
    ConferenceEnd { user: UserId },
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { user, url } => write!(f, "{user}_{url}"),
            Self::End { user, url } => write!(f, "end_{user}_{url}"),
            Self::Day { user, day } => write!(f, "day_end_{user}_{}", day.format("%d-%m-%Y")),
            Self::ConferenceEnd { user } => write!(f, "conf_end_{user}"),
        }
    }
}

/// Keys already sent, or currently being sent, by this process.
///
/// Lives in memory only: a restart forgets it. Keys are never expired, so
/// the set grows with users times reports.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    keys: Mutex<HashSet<DedupKey>>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.lock().contains(key)
    }

    /// Record `key` unless present. Returns `true` if the caller now owns
    /// the delivery.
    pub fn try_claim(&self, key: DedupKey) -> bool {
        self.lock().insert(key)
    }

    /// Forget a claim whose delivery failed so a later tick retries it.
    pub fn release(&self, key: &DedupKey) {
        self.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<DedupKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_released() {
        let ledger = NotificationLedger::new();
        let key = DedupKey::Start {
            user: 1,
            url: "https://conf/a".to_string(),
        };
        assert!(ledger.try_claim(key.clone()));
        assert!(!ledger.try_claim(key.clone()));
        assert!(ledger.contains(&key));

        ledger.release(&key);
        assert!(!ledger.contains(&key));
        assert!(ledger.try_claim(key));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_key_kinds_do_not_collide() {
        let ledger = NotificationLedger::new();
        let url = "https://conf/a".to_string();
        assert!(ledger.try_claim(DedupKey::Start { user: 1, url: url.clone() }));
        assert!(ledger.try_claim(DedupKey::End { user: 1, url }));
        assert!(ledger.try_claim(DedupKey::ConferenceEnd { user: 1 }));
        assert!(ledger.try_claim(DedupKey::ConferenceEnd { user: 2 }));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_display_format() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(DedupKey::Day { user: 7, day }.to_string(), "day_end_7_01-06-2024");
        assert_eq!(
            DedupKey::End {
                user: 7,
                url: "u".to_string()
            }
            .to_string(),
            "end_7_u"
        );
        assert_eq!(DedupKey::ConferenceEnd { user: 7 }.to_string(), "conf_end_7");
    }
}
