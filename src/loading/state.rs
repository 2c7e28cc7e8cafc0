//! Loading-state reduction.

use super::{ChatLoadingFailure, DataLoadingFailure};

/// Aggregate loading state, published once per load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLoadingState {
    /// A cycle is in flight.
    Loading,
    /// The last cycle completed with no recorded failures.
    Finished,
    /// The last cycle recorded failures. The failure sets are carried so
    /// a retry can re-run exactly the failed steps.
    Failed {
        /// Human-readable summary: distinct step names plus the detail
        /// of the largest identical-error group.
        message: String,
        /// Total number of failed steps.
        failure_count: usize,
        data_failures: Vec<DataLoadingFailure>,
        chat_failures: Vec<ChatLoadingFailure>,
    },
}

/// Reduce a cycle's recorded failures to one state.
///
/// A single failure renders as `<step>: <detail>`. Multiple failures
/// render each distinct step name once, in the order the failures were
/// recorded, followed on a new line by the detail of whichever
/// identical error occurred most often.
pub fn reduce(
    data_failures: Vec<DataLoadingFailure>,
    chat_failures: Vec<ChatLoadingFailure>,
) -> DataLoadingState {
    let failure_count = data_failures.len() + chat_failures.len();
    if failure_count == 0 {
        return DataLoadingState::Finished;
    }

    let labeled: Vec<(&str, String)> = data_failures
        .iter()
        .map(|f| (f.step.label(), f.error.to_string()))
        .chain(
            chat_failures
                .iter()
                .map(|f| (f.step.label(), f.error.to_string())),
        )
        .collect();

    let mut steps: Vec<&str> = Vec::new();
    for (label, _) in &labeled {
        if !steps.contains(label) {
            steps.push(*label);
        }
    }

    // Group identical error details; ties go to the earliest recorded.
    let mut groups: Vec<(&str, usize)> = Vec::new();
    for (_, detail) in &labeled {
        match groups.iter_mut().find(|(d, _)| *d == detail.as_str()) {
            Some(group) => group.1 += 1,
            None => groups.push((detail.as_str(), 1)),
        }
    }
    let mut detail = "";
    let mut best = 0;
    for &(group_detail, count) in &groups {
        if count > best {
            best = count;
            detail = group_detail;
        }
    }

    let message = if failure_count == 1 {
        format!("{}: {detail}", steps[0])
    } else {
        format!("{}\n{detail}", steps.join(", "))
    };
    DataLoadingState::Failed {
        message,
        failure_count,
        data_failures,
        chat_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::ident::{UserId, UserName};
    use crate::loading::{ChatLoadingStep, DataLoadingStep};

    fn channel_badges(channel: &str) -> DataLoadingStep {
        DataLoadingStep::ChannelBadges {
            channel: UserName::new(channel),
            channel_id: UserId::new("123"),
        }
    }

    fn data_failure(step: DataLoadingStep, detail: &str) -> DataLoadingFailure {
        DataLoadingFailure {
            step,
            error: LoadError::Other(detail.to_string()),
        }
    }

    #[test]
    fn no_failures_is_finished() {
        assert_eq!(reduce(Vec::new(), Vec::new()), DataLoadingState::Finished);
    }

    #[test]
    fn single_failure_names_step_and_detail() {
        let state = reduce(vec![data_failure(channel_badges("pajlada"), "404")], Vec::new());
        let DataLoadingState::Failed {
            message,
            failure_count,
            ..
        } = state
        else {
            panic!("expected a failed state");
        };
        assert_eq!(message, "ChannelBadges: 404");
        assert_eq!(failure_count, 1);
    }

    #[test]
    fn repeated_step_label_listed_once() {
        let state = reduce(
            vec![
                data_failure(channel_badges("a"), "404"),
                data_failure(channel_badges("b"), "404"),
            ],
            Vec::new(),
        );
        let DataLoadingState::Failed {
            message,
            failure_count,
            ..
        } = state
        else {
            panic!("expected a failed state");
        };
        assert_eq!(message, "ChannelBadges\n404");
        assert_eq!(failure_count, 2);
    }

    #[test]
    fn mixed_failures_use_largest_error_group() {
        let state = reduce(
            vec![
                data_failure(DataLoadingStep::GlobalBadges, "timeout"),
                data_failure(channel_badges("a"), "503"),
                data_failure(DataLoadingStep::GlobalFfzEmotes, "503"),
            ],
            vec![ChatLoadingFailure {
                step: ChatLoadingStep::Chatters {
                    channel: UserName::new("a"),
                },
                error: LoadError::Other("timeout".to_string()),
            }],
        );
        let DataLoadingState::Failed {
            message,
            failure_count,
            ..
        } = state
        else {
            panic!("expected a failed state");
        };
        // Two groups of two; the earlier-recorded detail wins the tie.
        assert_eq!(
            message,
            "GlobalBadges, ChannelBadges, GlobalFfzEmotes, Chatters\ntimeout"
        );
        assert_eq!(failure_count, 4);
    }

    #[test]
    fn failed_state_carries_the_failure_sets() {
        let data = vec![data_failure(channel_badges("a"), "404")];
        let state = reduce(data.clone(), Vec::new());
        let DataLoadingState::Failed { data_failures, chat_failures, .. } = state else {
            panic!("expected a failed state");
        };
        assert_eq!(data_failures, data);
        assert!(chat_failures.is_empty());
    }
}
