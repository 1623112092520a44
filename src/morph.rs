//! Morph state and per-group progress controllers.
//!
//! The UI owns a single [`MorphState`] through a [`MorphSwitch`]. Every group
//! that morphs owns one [`MorphController`], which chases the current target
//! with a first-order exponential approach:
//!
//! ```text
//! progress += (target - progress) * k * dt
//! ```
//!
//! Reversing the target mid-flight resumes from the current progress. The
//! blend factor handed to the evaluator is [`ease_in_out_cubic`] applied to
//! the current progress every frame.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which arrangement the scene is heading towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphState {
    /// Dispersed cloud.
    #[default]
    Scattered,
    /// Tree silhouette.
    Formed,
}

impl MorphState {
    /// Progress value this state converges to.
    #[inline]
    pub fn target(self) -> f32 {
        match self {
            MorphState::Scattered => 0.0,
            MorphState::Formed => 1.0,
        }
    }

    /// The other state.
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            MorphState::Scattered => MorphState::Formed,
            MorphState::Formed => MorphState::Scattered,
        }
    }
}

/// Shared, process-wide morph target.
///
/// Clones share the same cell. The UI side writes through [`set`](Self::set),
/// [`toggle`](Self::toggle) or a closure from [`setter`](Self::setter); the
/// scene only reads it once per frame.
#[derive(Debug, Clone, Default)]
pub struct MorphSwitch {
    formed: Arc<AtomicBool>,
}

impl MorphSwitch {
    pub fn new(initial: MorphState) -> Self {
        Self {
            formed: Arc::new(AtomicBool::new(initial == MorphState::Formed)),
        }
    }

    /// Current target state.
    #[inline]
    pub fn get(&self) -> MorphState {
        if self.formed.load(Ordering::Relaxed) {
            MorphState::Formed
        } else {
            MorphState::Scattered
        }
    }

    pub fn set(&self, state: MorphState) {
        let previous = self.formed.swap(state == MorphState::Formed, Ordering::Relaxed);
        if previous != (state == MorphState::Formed) {
            log::info!("morph target -> {:?}", state);
        }
    }

    /// Flip the target and return the new state.
    pub fn toggle(&self) -> MorphState {
        let next = self.get().toggled();
        self.set(next);
        next
    }

    /// Setter callback for a UI collaborator.
    pub fn setter(&self) -> impl Fn(MorphState) + Send + Sync + 'static {
        let switch = self.clone();
        move |state| switch.set(state)
    }
}

/// Convergence state of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupProgress {
    /// Current progress in `[0, 1]`.
    pub progress: f32,
    /// State being chased.
    pub target: MorphState,
}

impl GroupProgress {
    /// Progress already settled at `state`, so the first frame does not snap.
    pub fn settled(state: MorphState) -> Self {
        Self {
            progress: state.target(),
            target: state,
        }
    }

    /// Eased blend factor for the current progress.
    #[inline]
    pub fn blend(&self) -> f32 {
        ease_in_out_cubic(self.progress)
    }
}

/// Advance `state` by one frame towards `target`.
///
/// The per-frame step `k * dt` is clamped to `[0, 1]`, so a long frame lands
/// on the target instead of overshooting it. Negative or non-finite `dt` and
/// `k` leave progress unchanged.
pub fn update(state: GroupProgress, dt: f32, target: MorphState, k: f32) -> GroupProgress {
    let step = if dt.is_finite() && k.is_finite() {
        (k * dt).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let goal = target.target();
    let progress = state.progress + (goal - state.progress) * step;

    GroupProgress {
        progress: progress.clamp(0.0, 1.0),
        target,
    }
}

/// Cubic ease-in-out: `4t³` below one half, `1 - (-2t + 2)³ / 2` above.
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Steepest slope of [`ease_in_out_cubic`], reached at `t = 0.5`.
pub const EASE_MAX_SLOPE: f32 = 3.0;

/// Owns the progress of one morphing group.
#[derive(Debug, Clone)]
pub struct MorphController {
    state: GroupProgress,
    damping: f32,
}

impl MorphController {
    /// Controller settled at `initial` with damping rate `damping` (per second).
    pub fn new(initial: MorphState, damping: f32) -> Self {
        let damping = if damping.is_finite() { damping.max(0.0) } else { 0.0 };
        Self {
            state: GroupProgress::settled(initial),
            damping,
        }
    }

    /// Advance one frame and return the eased blend factor.
    pub fn advance(&mut self, dt: f32, target: MorphState) -> f32 {
        self.state = update(self.state, dt, target, self.damping);
        self.state.blend()
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        self.state.progress
    }

    #[inline]
    pub fn target(&self) -> MorphState {
        self.state.target
    }

    #[inline]
    pub fn blend(&self) -> f32 {
        self.state.blend()
    }

    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn state(&self) -> GroupProgress {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.75) - 0.9375).abs() < 1e-6);
    }

    #[test]
    fn test_ease_is_monotonic() {
        let mut last = 0.0;
        for i in 1..=1000 {
            let v = ease_in_out_cubic(i as f32 / 1000.0);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_initial_state_does_not_snap() {
        let c = MorphController::new(MorphState::Formed, 1.5);
        assert_eq!(c.progress(), 1.0);
        let c = MorphController::new(MorphState::Scattered, 1.5);
        assert_eq!(c.progress(), 0.0);
    }

    #[test]
    fn test_converges_to_formed() {
        let mut state = GroupProgress::settled(MorphState::Scattered);
        let k = 1.5;
        let frames = ((10.0 / k) / DT).ceil() as usize;
        for _ in 0..frames {
            state = update(state, DT, MorphState::Formed, k);
        }
        assert!(state.progress > 0.9999, "{}", state.progress);
    }

    #[test]
    fn test_converges_to_scattered() {
        let mut state = GroupProgress::settled(MorphState::Formed);
        for _ in 0..2_000 {
            state = update(state, DT, MorphState::Scattered, 1.2);
        }
        assert!(state.progress < 1e-4);
    }

    #[test]
    fn test_large_step_does_not_overshoot() {
        let state = GroupProgress::settled(MorphState::Scattered);
        let next = update(state, 5.0, MorphState::Formed, 1.8);
        assert_eq!(next.progress, 1.0);
        let back = update(next, 100.0, MorphState::Scattered, 1.8);
        assert_eq!(back.progress, 0.0);
    }

    #[test]
    fn test_bad_dt_is_ignored() {
        let state = GroupProgress {
            progress: 0.4,
            target: MorphState::Formed,
        };
        assert_eq!(update(state, -1.0, MorphState::Formed, 1.5).progress, 0.4);
        assert_eq!(update(state, f32::NAN, MorphState::Formed, 1.5).progress, 0.4);
    }

    #[test]
    fn test_retarget_resumes_from_current() {
        let mut c = MorphController::new(MorphState::Scattered, 1.5);
        for _ in 0..30 {
            c.advance(DT, MorphState::Formed);
        }
        let mid = c.progress();
        assert!(mid > 0.0 && mid < 1.0);
        c.advance(DT, MorphState::Scattered);
        let after = c.progress();
        assert!(after < mid);
        assert!(mid - after <= 1.5 * DT * mid + 1e-6);
        assert_eq!(c.target(), MorphState::Scattered);
    }

    #[test]
    fn test_switch_is_shared() {
        let switch = MorphSwitch::new(MorphState::Scattered);
        let ui = switch.setter();
        ui(MorphState::Formed);
        assert_eq!(switch.get(), MorphState::Formed);
        let other = switch.clone();
        assert_eq!(other.toggle(), MorphState::Scattered);
        assert_eq!(switch.get(), MorphState::Scattered);
    }
}
