//! Reinjection resolution.
//!
//! A sample's reinject state is a pure function of its parsed record and the
//! externally supplied history — computed fresh on every pass, never stored,
//! so re-running a folder is always safe.

use ab1_set::SampleFilenameRecord;
use order_types::{ReinjectDecision, ReinjectState};
use std::collections::HashSet;

/// Decide whether `record` must be re-run.
///
/// The `{!P}` flag forces a preemptive reinject and overrides any
/// historical-list membership; otherwise a history hit on the normalized
/// identity means a standard reinject.
pub fn resolve(record: &SampleFilenameRecord, history: &HashSet<String>) -> ReinjectDecision {
    if record.preemptive {
        return ReinjectDecision {
            state: ReinjectState::Preemptive,
            reason: "{!P} flag present in filename".to_string(),
        };
    }
    if history.contains(&record.normalized) {
        return ReinjectDecision {
            state: ReinjectState::Standard,
            reason: format!(
                "'{}' appears on the historical reinject list",
                record.normalized
            ),
        };
    }
    ReinjectDecision {
        state: ReinjectState::NoActionNeeded,
        reason: "no reinject flag or history match".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history(entries: &[&str]) -> HashSet<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn preemptive_flag_wins_even_with_empty_history() {
        let record = SampleFilenameRecord::parse("bioi-1023_{!P}_sample.fsa");
        let decision = resolve(&record, &history(&[]));
        assert_eq!(decision.state, ReinjectState::Preemptive);
        assert!(decision.needs_reinject());
    }

    #[test]
    fn preemptive_flag_overrides_history_membership() {
        let record = SampleFilenameRecord::parse("bioi-1023_{!P}_sample.fsa");
        let decision = resolve(&record, &history(&["bioi-1023__sample"]));
        assert_eq!(decision.state, ReinjectState::Preemptive);
    }

    #[test]
    fn history_match_is_a_standard_reinject() {
        let record = SampleFilenameRecord::parse("bioi-1023_sample.fsa");
        let decision = resolve(&record, &history(&["bioi-1023_sample"]));
        assert_eq!(decision.state, ReinjectState::Standard);
        assert!(decision.reason.contains("historical"));
    }

    #[test]
    fn no_flag_and_no_history_means_no_action() {
        let record = SampleFilenameRecord::parse("bioi-1023_sample.fsa");
        let decision = resolve(&record, &history(&[]));
        assert_eq!(decision.state, ReinjectState::NoActionNeeded);
        assert!(!decision.needs_reinject());
    }
}
