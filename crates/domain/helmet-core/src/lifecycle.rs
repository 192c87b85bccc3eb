//! Scenario-run state machine.
//!
//! `Idle -> Running -> Idle` for a cycle that runs to the end of its list, and
//! `Running -> Cancelling -> Idle` when it is interrupted. A cycle id ties progress
//! reports to the cycle that produced them so reports from an abandoned cycle can be
//! recognised and dropped.

use crate::scenario::RunCycleId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        cycle: RunCycleId,
        total: usize,
        completed: usize,
    },
    Cancelling {
        cycle: RunCycleId,
    },
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
            RunState::Cancelling { .. } => "cancelling",
        }
    }
}

/// How a cycle left the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    /// The list was exhausted; an all-complete event is due.
    Completed,
    /// The cycle was cancelled; nothing further is reported.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("a run cycle is already {state}")]
    Busy { state: &'static str },
    #[error("run cycle {0} is not the active cycle")]
    StaleCycle(RunCycleId),
}

#[derive(Debug, Default)]
pub struct RunLifecycle {
    state: RunState,
}

impl RunLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, RunState::Idle)
    }

    /// The cycle whose progress is still reportable.
    pub fn running_cycle(&self) -> Option<RunCycleId> {
        match self.state {
            RunState::Running { cycle, .. } => Some(cycle),
            _ => None,
        }
    }

    pub fn start(&mut self, total: usize) -> Result<RunCycleId, LifecycleError> {
        if !self.is_idle() {
            return Err(LifecycleError::Busy {
                state: self.state.name(),
            });
        }
        let cycle = uuid::Uuid::new_v4();
        self.state = RunState::Running {
            cycle,
            total,
            completed: 0,
        };
        Ok(cycle)
    }

    /// `(completed, total)` of the running cycle.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self.state {
            RunState::Running {
                total, completed, ..
            } => Some((completed, total)),
            _ => None,
        }
    }

    /// Records a finished scenario. Returns the number finished so far in this cycle.
    pub fn scenario_finished(&mut self, cycle: RunCycleId) -> Result<usize, LifecycleError> {
        match &mut self.state {
            RunState::Running {
                cycle: active,
                completed,
                ..
            } if *active == cycle => {
                *completed += 1;
                Ok(*completed)
            }
            _ => Err(LifecycleError::StaleCycle(cycle)),
        }
    }

    /// `Running -> Cancelling`. Returns the interrupted cycle, or `None` if nothing runs.
    pub fn cancel(&mut self) -> Option<RunCycleId> {
        match self.state {
            RunState::Running { cycle, .. } => {
                self.state = RunState::Cancelling { cycle };
                Some(cycle)
            }
            _ => None,
        }
    }

    /// The cycle's task has stopped, either at the end of its list or after an interrupt.
    pub fn finish(&mut self, cycle: RunCycleId) -> Result<CycleEnd, LifecycleError> {
        let end = match self.state {
            RunState::Running { cycle: active, .. } if active == cycle => CycleEnd::Completed,
            RunState::Cancelling { cycle: active } if active == cycle => CycleEnd::Cancelled,
            _ => return Err(LifecycleError::StaleCycle(cycle)),
        };
        self.state = RunState::Idle;
        Ok(end)
    }
}
