//! Winner selection among conflicting document versions
//!
//! The only supported policy is "latest modification wins": the version with
//! the strictly greatest modification time is kept, and on a tie the version
//! already current stays. Among conflicting versions sharing the greatest
//! time, the first one reported by the store wins.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use docsync_core::domain::version::ConflictVersion;

use crate::error::ConflictError;

/// Winner selection policy, configured as `conflicts.winner_policy`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WinnerPolicy {
    #[default]
    LatestModification,
}

impl WinnerPolicy {
    /// Pick the version to keep, or `None` when there are no versions at all
    pub fn select<'a>(
        &self,
        current: Option<&'a ConflictVersion>,
        conflicting: &'a [ConflictVersion],
    ) -> Option<&'a ConflictVersion> {
        match self {
            WinnerPolicy::LatestModification => select_winner(current, conflicting),
        }
    }
}

impl FromStr for WinnerPolicy {
    type Err = ConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest_modification" => Ok(WinnerPolicy::LatestModification),
            other => Err(ConflictError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for WinnerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinnerPolicy::LatestModification => f.write_str("latest_modification"),
        }
    }
}

/// Latest-modification-wins selection with the incumbent keeping ties
///
/// Starts from `current` (or the first conflicting version when there is no
/// current one) and replaces the candidate only on a strictly later time.
pub fn select_winner<'a>(
    current: Option<&'a ConflictVersion>,
    conflicting: &'a [ConflictVersion],
) -> Option<&'a ConflictVersion> {
    let mut candidates = current.into_iter().chain(conflicting.iter());
    let mut winner = candidates.next()?;

    for version in candidates {
        if version.modified_at() > winner.modified_at() {
            trace!(
                handle = %version.handle(),
                modified_at = %version.modified_at(),
                "New latest version"
            );
            winner = version;
        }
    }

    Some(winner)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use docsync_core::domain::newtypes::VersionId;

    use super::*;

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn conflicting(secs: &[i64]) -> Vec<ConflictVersion> {
        secs.iter()
            .map(|s| ConflictVersion::conflicting(VersionId::new(), at(*s)))
            .collect()
    }

    #[test]
    fn test_latest_conflicting_beats_older_current() {
        let current = ConflictVersion::current(VersionId::new(), at(10));
        let others = conflicting(&[30, 20]);

        let winner = select_winner(Some(&current), &others).unwrap();
        assert_eq!(winner.modified_at(), at(30));
        assert!(!winner.is_current());
    }

    #[test]
    fn test_latest_current_is_kept() {
        let current = ConflictVersion::current(VersionId::new(), at(30));
        let others = conflicting(&[10, 20]);

        let winner = select_winner(Some(&current), &others).unwrap();
        assert!(winner.is_current());
    }

    #[test]
    fn test_tie_keeps_current() {
        let current = ConflictVersion::current(VersionId::new(), at(20));
        let others = conflicting(&[20, 5]);

        let winner = select_winner(Some(&current), &others).unwrap();
        assert_eq!(winner.handle(), current.handle());
    }

    #[test]
    fn test_tie_among_conflicting_keeps_first_reported() {
        let others = conflicting(&[40, 40, 7]);

        let winner = select_winner(None, &others).unwrap();
        assert_eq!(winner.handle(), others[0].handle());
    }

    #[test]
    fn test_no_versions_selects_nothing() {
        assert!(select_winner(None, &[]).is_none());
    }

    #[test]
    fn test_policy_parse() {
        let policy: WinnerPolicy = "latest_modification".parse().unwrap();
        assert_eq!(policy, WinnerPolicy::LatestModification);
        assert_eq!(policy.to_string(), "latest_modification");

        let result: Result<WinnerPolicy, _> = "keep_both".parse();
        assert!(matches!(result, Err(ConflictError::UnknownPolicy(_))));
    }

    #[test]
    fn test_policy_select_delegates() {
        let current = ConflictVersion::current(VersionId::new(), at(1));
        let others = conflicting(&[2]);
        let winner = WinnerPolicy::default()
            .select(Some(&current), &others)
            .unwrap();
        assert_eq!(winner.modified_at(), at(2));
    }
}
