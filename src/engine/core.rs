// src/engine/core.rs

//! Pure gating decision for one (run, pipeline) pair.
//!
//! No IO happens here: the orchestrator gathers the facts from disk and this
//! module turns them into either "launch" or a skip state.

use crate::types::Conditions;

use super::PipelineState;

pub const NOT_ALREADY_COMPLETE: &str = "analysis_not_already_complete";
pub const DEPENDENCIES_MET: &str = "pipeline_dependencies_met";

/// Outcome of the gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Launch,
    Skip {
        state: PipelineState,
        conditions: Conditions,
    },
}

/// Predicate map logged with every skip.
pub fn gate_conditions(already_complete: bool, dependencies_met: bool) -> Conditions {
    Conditions::new()
        .with(NOT_ALREADY_COMPLETE, !already_complete)
        .with(DEPENDENCIES_MET, dependencies_met)
}

/// A completed pipeline is reported as already done even if its dependencies
/// have since disappeared.
pub fn decide(already_complete: bool, dependencies_met: bool) -> GateDecision {
    let conditions = gate_conditions(already_complete, dependencies_met);
    let state = if already_complete {
        PipelineState::SkippedAlreadyDone
    } else if !dependencies_met {
        PipelineState::SkippedUnmetDependency
    } else {
        return GateDecision::Launch;
    };
    GateDecision::Skip { state, conditions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skip_state(d: GateDecision) -> Option<PipelineState> {
        match d {
            GateDecision::Launch => None,
            GateDecision::Skip { state, .. } => Some(state),
        }
    }

    #[test]
    fn launches_only_when_not_done_and_deps_met() {
        assert_eq!(decide(false, true), GateDecision::Launch);
        assert_eq!(
            skip_state(decide(false, false)),
            Some(PipelineState::SkippedUnmetDependency)
        );
    }

    #[test]
    fn already_done_wins_over_unmet_dependency() {
        assert_eq!(
            skip_state(decide(true, false)),
            Some(PipelineState::SkippedAlreadyDone)
        );
    }

    #[test]
    fn skip_carries_full_predicate_map() {
        let GateDecision::Skip { conditions, .. } = decide(true, true) else {
            panic!("expected skip");
        };
        assert_eq!(conditions.get(NOT_ALREADY_COMPLETE), Some(false));
        assert_eq!(conditions.get(DEPENDENCIES_MET), Some(true));
    }
}
