use serde::Serialize;

use hallwatch_core::SessionInfo;

use crate::spring::{Spring, SpringTuning};

/// Visual state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Available,
    Used,
    Banned,
    Suspended,
    Processing,
}

pub(crate) const AVAILABLE_PROMPT: &str = "SCAN TO GO OUT";
pub(crate) const BANNED_TEXT: &str = "BANNED";
pub(crate) const SUSPENDED_TEXT: &str = "SUSPENDED";
pub(crate) const PROCESSING_TEXT: &str = "CHECKING";

/// Velocity impulses injected on a kind change so the slot visibly pops
/// instead of silently swapping content.
const POP_IMPULSE: f32 = 2.5;
const SPIN_IMPULSE: f32 = 220.0; // degrees per second

/// One animated slot. Not persistently bound to any session identity; the
/// pool rebinds it on every reconcile.
#[derive(Debug, Clone)]
pub struct Slot {
    pub(crate) id: u64,
    pub(crate) kind: SlotKind,
    pub(crate) x: Spring,
    pub(crate) y: Spring,
    pub(crate) scale: Spring,
    pub(crate) rotation: Spring,
    pub(crate) name: String,
    pub(crate) timer: String,
    pub(crate) overdue: bool,
    /// Lookup key into the elapsed tracker, never a data reference. Cleared
    /// whenever the kind moves away from `Used`.
    pub(crate) session_id: Option<i64>,
}

impl Slot {
    /// Spawn fully shrunk at a position; reconciliation assigns targets, so
    /// a new slot appears to split off its neighbor rather than popping in.
    pub(crate) fn spawn_at(id: u64, x: f32, y: f32, tuning: &SpringTuning) -> Self {
        Slot {
            id,
            kind: SlotKind::Available,
            x: Spring::new(x, tuning.position),
            y: Spring::new(y, tuning.position),
            scale: Spring::new(0.0, tuning.scale),
            rotation: Spring::new(0.0, tuning.rotation),
            name: AVAILABLE_PROMPT.to_string(),
            timer: String::new(),
            overdue: false,
            session_id: None,
        }
    }

    /// Drive the slot toward a kind and bound session. A kind change pops
    /// the scale and rotation springs; content always rewrites.
    pub(crate) fn retarget(&mut self, kind: SlotKind, session: Option<&SessionInfo>) {
        if kind != self.kind {
            self.scale.nudge(POP_IMPULSE);
            self.rotation.nudge(if self.id % 2 == 0 { SPIN_IMPULSE } else { -SPIN_IMPULSE });
            self.kind = kind;
        }
        match kind {
            SlotKind::Used => {
                if let Some(session) = session {
                    self.name = session.name.clone();
                    self.overdue = session.overdue;
                    self.session_id = Some(session.id);
                }
            }
            SlotKind::Available => self.rewrite_fixed(AVAILABLE_PROMPT),
            SlotKind::Banned => self.rewrite_fixed(BANNED_TEXT),
            SlotKind::Suspended => self.rewrite_fixed(SUSPENDED_TEXT),
            SlotKind::Processing => self.rewrite_fixed(PROCESSING_TEXT),
        }
    }

    fn rewrite_fixed(&mut self, text: &str) {
        self.name = text.to_string();
        self.timer.clear();
        self.overdue = false;
        self.session_id = None;
    }

    /// Advance all four springs by one pre-clamped step.
    pub(crate) fn advance(&mut self, dt: f32) {
        self.x.update(dt);
        self.y.update(dt);
        self.scale.update(dt);
        self.rotation.update(dt);
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timer(&self) -> &str {
        &self.timer
    }

    pub fn overdue(&self) -> bool {
        self.overdue
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: i64, name: &str, overdue: bool) -> SessionInfo {
        SessionInfo {
            id,
            name: name.to_string(),
            elapsed: 0,
            overdue,
            start_ms: 0,
        }
    }

    #[test]
    fn kind_change_pops_scale_and_rotation() {
        let tuning = SpringTuning::default();
        let mut slot = Slot::spawn_at(0, 50.0, 50.0, &tuning);
        assert_eq!(slot.scale.velocity(), 0.0);

        slot.retarget(SlotKind::Used, Some(&session(7, "Alex", true)));
        assert!(slot.scale.velocity() > 0.0);
        assert!(slot.rotation.velocity() != 0.0);
        assert_eq!(slot.name(), "Alex");
        assert!(slot.overdue());
        assert_eq!(slot.session_id(), Some(7));
    }

    #[test]
    fn same_kind_retarget_does_not_pop() {
        let tuning = SpringTuning::default();
        let mut slot = Slot::spawn_at(0, 50.0, 50.0, &tuning);
        slot.retarget(SlotKind::Used, Some(&session(7, "Alex", false)));
        let settled = {
            let mut s = slot.clone();
            for _ in 0..10_000 {
                s.advance(1.0 / 60.0);
            }
            s
        };
        let mut slot = settled;
        slot.retarget(SlotKind::Used, Some(&session(7, "Alex", false)));
        assert_eq!(slot.scale.velocity(), 0.0);
    }

    #[test]
    fn leaving_used_clears_session_binding() {
        let tuning = SpringTuning::default();
        let mut slot = Slot::spawn_at(1, 50.0, 50.0, &tuning);
        slot.retarget(SlotKind::Used, Some(&session(3, "Sam", false)));
        slot.timer = "1:05".to_string();

        slot.retarget(SlotKind::Available, None);
        assert_eq!(slot.session_id(), None);
        assert_eq!(slot.timer(), "");
        assert_eq!(slot.name(), AVAILABLE_PROMPT);
        assert!(!slot.overdue());
    }
}
