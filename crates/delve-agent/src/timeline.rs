// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage timeline: the pure state machine a query passes through.
//!
//! Forward order is `idle → fetchingLinks → gatheringLinks →
//! fetchingAiAnalysis → subquestions → analysis → synthesis → final`, with
//! two deviations: a link fetch with no results skips `gatheringLinks`, and
//! any non-idle, non-terminal stage may fail into `error`.
//!
//! The timeline does no I/O and knows nothing about timers. The query driver
//! feeds it [`TimelineEvent`]s and acts on the stage it lands in.

use delve_core::{DelveError, Stage};

/// An input to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// A query was submitted; starts a new lifecycle.
    Submitted,
    /// The link fetch succeeded with `count` results.
    LinksFetched { count: usize },
    /// The per-link reveal delay elapsed.
    LinkRevealed,
    /// The AI analysis arrived.
    AnalysisReceived,
    /// A stage dwell delay elapsed.
    DwellElapsed,
    /// A network or validation failure.
    Failed,
}

impl TimelineEvent {
    /// Short name used in transition errors.
    pub fn name(self) -> &'static str {
        match self {
            TimelineEvent::Submitted => "submitted",
            TimelineEvent::LinksFetched { .. } => "links_fetched",
            TimelineEvent::LinkRevealed => "link_revealed",
            TimelineEvent::AnalysisReceived => "analysis_received",
            TimelineEvent::DwellElapsed => "dwell_elapsed",
            TimelineEvent::Failed => "failed",
        }
    }
}

/// Current stage plus the reveal cursor over fetched links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    stage: Stage,
    link_count: usize,
    cursor: usize,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Index of the link on display; only defined while gathering links.
    pub fn cursor(&self) -> Option<usize> {
        (self.stage == Stage::GatheringLinks).then_some(self.cursor)
    }

    /// Applies `event` and returns the stage landed in.
    ///
    /// Illegal transitions leave the timeline untouched.
    pub fn apply(&mut self, event: TimelineEvent) -> Result<Stage, DelveError> {
        let next = match (self.stage, event) {
            (Stage::Idle | Stage::Final | Stage::Error, TimelineEvent::Submitted) => {
                self.link_count = 0;
                self.cursor = 0;
                Stage::FetchingLinks
            }
            (Stage::FetchingLinks, TimelineEvent::LinksFetched { count }) => {
                self.link_count = count;
                self.cursor = 0;
                if count == 0 {
                    Stage::FetchingAiAnalysis
                } else {
                    Stage::GatheringLinks
                }
            }
            (Stage::GatheringLinks, TimelineEvent::LinkRevealed) => {
                if self.cursor + 1 < self.link_count {
                    self.cursor += 1;
                    Stage::GatheringLinks
                } else {
                    Stage::FetchingAiAnalysis
                }
            }
            (Stage::FetchingAiAnalysis, TimelineEvent::AnalysisReceived) => Stage::Subquestions,
            (Stage::Subquestions, TimelineEvent::DwellElapsed) => Stage::Analysis,
            (Stage::Analysis, TimelineEvent::DwellElapsed) => Stage::Synthesis,
            (Stage::Synthesis, TimelineEvent::DwellElapsed) => Stage::Final,
            (stage, TimelineEvent::Failed) if stage.is_pending() => Stage::Error,
            (from, event) => {
                return Err(DelveError::IllegalTransition {
                    from,
                    event: event.name(),
                });
            }
        };
        self.stage = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Drives a full successful lifecycle and records every stage entered.
    fn run_to_final(link_count: usize) -> (Vec<Stage>, Vec<usize>) {
        let mut timeline = Timeline::new();
        let mut stages = vec![timeline.apply(TimelineEvent::Submitted).unwrap()];
        let mut cursors = Vec::new();

        stages.push(
            timeline
                .apply(TimelineEvent::LinksFetched { count: link_count })
                .unwrap(),
        );
        while let Some(cursor) = timeline.cursor() {
            cursors.push(cursor);
            let stage = timeline.apply(TimelineEvent::LinkRevealed).unwrap();
            if stage != Stage::GatheringLinks {
                stages.push(stage);
            }
        }
        stages.push(timeline.apply(TimelineEvent::AnalysisReceived).unwrap());
        while timeline.stage() != Stage::Final {
            stages.push(timeline.apply(TimelineEvent::DwellElapsed).unwrap());
        }
        (stages, cursors)
    }

    #[test]
    fn three_links_walk_every_stage_in_order() {
        let (stages, cursors) = run_to_final(3);
        assert_eq!(
            stages,
            vec![
                Stage::FetchingLinks,
                Stage::GatheringLinks,
                Stage::FetchingAiAnalysis,
                Stage::Subquestions,
                Stage::Analysis,
                Stage::Synthesis,
                Stage::Final,
            ]
        );
        assert_eq!(cursors, vec![0, 1, 2]);
    }

    #[test]
    fn zero_links_skip_gathering() {
        let (stages, cursors) = run_to_final(0);
        assert_eq!(stages[1], Stage::FetchingAiAnalysis);
        assert!(!stages.contains(&Stage::GatheringLinks));
        assert!(cursors.is_empty());
    }

    #[test]
    fn failure_is_reachable_from_every_pending_stage() {
        for stage in [
            Stage::FetchingLinks,
            Stage::GatheringLinks,
            Stage::FetchingAiAnalysis,
            Stage::Subquestions,
            Stage::Analysis,
            Stage::Synthesis,
        ] {
            let mut timeline = Timeline {
                stage,
                link_count: 2,
                cursor: 0,
            };
            assert_eq!(timeline.apply(TimelineEvent::Failed).unwrap(), Stage::Error);
            assert_eq!(timeline.cursor(), None);
        }
    }

    #[test]
    fn terminal_and_idle_stages_cannot_fail() {
        for stage in [Stage::Idle, Stage::Final, Stage::Error] {
            let mut timeline = Timeline {
                stage,
                ..Timeline::default()
            };
            let err = timeline.apply(TimelineEvent::Failed).unwrap_err();
            assert!(matches!(err, DelveError::IllegalTransition { from, event: "failed" } if from == stage));
            assert_eq!(timeline.stage(), stage);
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let mut timeline = Timeline::new();
        assert!(timeline.apply(TimelineEvent::AnalysisReceived).is_err());
        timeline.apply(TimelineEvent::Submitted).unwrap();
        assert!(timeline.apply(TimelineEvent::DwellElapsed).is_err());
        assert!(timeline.apply(TimelineEvent::Submitted).is_err());
        assert_eq!(timeline.stage(), Stage::FetchingLinks);
    }

    #[test]
    fn resubmitting_resets_the_cursor() {
        let mut timeline = Timeline::new();
        timeline.apply(TimelineEvent::Submitted).unwrap();
        timeline
            .apply(TimelineEvent::LinksFetched { count: 4 })
            .unwrap();
        timeline.apply(TimelineEvent::LinkRevealed).unwrap();
        assert_eq!(timeline.cursor(), Some(1));
        timeline.apply(TimelineEvent::Failed).unwrap();

        timeline.apply(TimelineEvent::Submitted).unwrap();
        assert_eq!(timeline.cursor(), None);
        timeline
            .apply(TimelineEvent::LinksFetched { count: 2 })
            .unwrap();
        assert_eq!(timeline.cursor(), Some(0));
    }

    proptest! {
        #[test]
        fn reveal_steps_match_link_count(n in 0usize..64) {
            let (stages, cursors) = run_to_final(n);
            prop_assert_eq!(cursors.len(), n);
            for (expected, cursor) in cursors.iter().enumerate() {
                prop_assert_eq!(*cursor, expected);
            }
            let mut sorted = stages.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted, stages, "no stage is revisited or reordered");
        }

        #[test]
        fn cursor_stays_in_bounds(n in 1usize..32, reveals in 0usize..40) {
            let mut timeline = Timeline::new();
            timeline.apply(TimelineEvent::Submitted).unwrap();
            timeline.apply(TimelineEvent::LinksFetched { count: n }).unwrap();
            for _ in 0..reveals {
                if timeline.apply(TimelineEvent::LinkRevealed).is_err() {
                    break;
                }
                if let Some(cursor) = timeline.cursor() {
                    prop_assert!(cursor < n);
                }
            }
            prop_assert_eq!(
                timeline.stage() == Stage::FetchingAiAnalysis,
                reveals >= n
            );
        }
    }
}
