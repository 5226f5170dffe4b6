//! Effect Stack
//!
//! The runtime tracks which computation is currently running with an
//! explicit stack. Running an effect pushes its ID; the guard pops it when
//! dropped, even if the computation panics.
//!
//! A frame may also be empty: that is how tracking is paused. Reads made
//! while the top frame is empty register nothing.

use parking_lot::Mutex;

use super::runtime::Runtime;
use crate::graph::EffectId;

#[derive(Debug, Default)]
pub(crate) struct EffectStack {
    frames: Mutex<Vec<Option<EffectId>>>,
}

impl EffectStack {
    pub(crate) fn push(&self, frame: Option<EffectId>) {
        self.frames.lock().push(frame);
    }

    pub(crate) fn pop(&self) -> Option<Option<EffectId>> {
        self.frames.lock().pop()
    }

    /// The effect reads should be recorded against, if any.
    pub(crate) fn current(&self) -> Option<EffectId> {
        self.frames.lock().last().copied().flatten()
    }

    /// The innermost running effect, looking through paused frames.
    pub(crate) fn running(&self) -> Option<EffectId> {
        self.frames.lock().iter().rev().find_map(|frame| *frame)
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Guard that pops its frame off the effect stack when dropped.
pub(crate) struct ContextGuard {
    runtime: Runtime,
    frame: Option<EffectId>,
}

impl ContextGuard {
    pub(crate) fn enter(runtime: &Runtime, frame: Option<EffectId>) -> Self {
        runtime.stack().push(frame);
        Self {
            runtime: runtime.clone(),
            frame,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let popped = self.runtime.stack().pop();

        // Catches guards dropped out of order.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "effect stack mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_current_effect() {
        let runtime = Runtime::new();
        let id = EffectId::new();

        assert!(runtime.active_effect().is_none());
        {
            let _ctx = ContextGuard::enter(&runtime, Some(id));
            assert_eq!(runtime.active_effect(), Some(id));
        }
        assert!(runtime.active_effect().is_none());
        assert_eq!(runtime.stack().depth(), 0);
    }

    #[test]
    fn nested_frames() {
        let runtime = Runtime::new();
        let outer = EffectId::new();
        let inner = EffectId::new();

        let _outer_ctx = ContextGuard::enter(&runtime, Some(outer));
        {
            let _inner_ctx = ContextGuard::enter(&runtime, Some(inner));
            assert_eq!(runtime.active_effect(), Some(inner));
            assert_eq!(runtime.stack().depth(), 2);
        }
        assert_eq!(runtime.active_effect(), Some(outer));
    }

    #[test]
    fn empty_frame_pauses_tracking() {
        let runtime = Runtime::new();
        let id = EffectId::new();

        let _ctx = ContextGuard::enter(&runtime, Some(id));
        {
            let _paused = ContextGuard::enter(&runtime, None);
            assert!(runtime.active_effect().is_none());
            assert!(!runtime.is_tracking());
            assert_eq!(runtime.stack().running(), Some(id));
        }
        assert_eq!(runtime.active_effect(), Some(id));
    }
}
