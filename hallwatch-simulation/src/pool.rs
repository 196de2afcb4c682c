use std::time::Instant;

use hallwatch_core::{ElapsedTracker, ScanResult, SessionInfo, Snapshot};

use crate::frame::{Frame, SlotFrame};
use crate::layout::layout;
use crate::slot::{Slot, SlotKind};
use crate::spring::SpringTuning;

/// Viewport shape in device units.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Owns the animated slots and reconciles them against server snapshots.
///
/// The pool has exactly one writer: the render loop thread. Snapshots and
/// scan results reach it as plain values through that thread's event drain,
/// never from another thread directly.
pub struct SlotPool {
    slots: Vec<Slot>,
    next_id: u64,
    tuning: SpringTuning,
    viewport: Viewport,
    tracker: ElapsedTracker,
    queue: Vec<String>,
    capacity: u32,
    occupancy: u32,
    suspended: bool,
    overdue_minutes: u32,
    auto_ban_overdue: bool,
}

impl SlotPool {
    pub fn new(viewport: Viewport, tuning: SpringTuning) -> Self {
        SlotPool {
            slots: Vec::new(),
            next_id: 0,
            tuning,
            viewport,
            tracker: ElapsedTracker::new(),
            queue: Vec::new(),
            capacity: 1,
            occupancy: 0,
            suspended: false,
            overdue_minutes: 12,
            auto_ban_overdue: false,
        }
    }

    /// Reconcile the pool against a freshly-installed snapshot.
    pub fn reconcile(&mut self, snapshot: &Snapshot) {
        self.reconcile_at(snapshot, Instant::now());
    }

    pub fn reconcile_at(&mut self, snapshot: &Snapshot, now: Instant) {
        let sessions = snapshot.sessions();
        self.capacity = snapshot.capacity_or(self.capacity);
        self.occupancy = sessions.len() as u32;
        self.suspended = snapshot.kiosk_suspended;
        self.queue = snapshot.queue.clone();
        self.overdue_minutes = snapshot.overdue_minutes;
        self.auto_ban_overdue = snapshot.auto_ban_overdue;
        self.tracker.observe(&sessions, now);

        // Desired slot list: one used slot per occupant plus one open slot
        // while below capacity, or a single suspended slot.
        let desired: Vec<(SlotKind, Option<&SessionInfo>)> = if self.suspended {
            vec![(SlotKind::Suspended, None)]
        } else {
            let mut desired: Vec<_> = sessions
                .iter()
                .map(|s| (SlotKind::Used, Some(s)))
                .collect();
            if (sessions.len() as u32) < self.capacity {
                desired.push((SlotKind::Available, None));
            }
            desired
        };

        self.resize_to(&desired);

        let placements = layout(desired.len(), self.viewport.width, self.viewport.height);
        for ((slot, (kind, session)), placement) in
            self.slots.iter_mut().zip(&desired).zip(&placements)
        {
            slot.x.retarget(placement.x);
            slot.y.retarget(placement.y);
            slot.scale.retarget(placement.scale);
            slot.rotation.retarget(0.0);
            slot.retarget(*kind, *session);
        }
    }

    /// Resize the pool to the desired length. Surviving slots are matched
    /// to sessions by stable session id first so a session that moves
    /// position in the list keeps its slot; everything else is recycled in
    /// index order. New slots spawn at the last slot's current position;
    /// extras drop from the tail.
    fn resize_to(&mut self, desired: &[(SlotKind, Option<&SessionInfo>)]) {
        let anchor = self
            .slots
            .last()
            .map(|s| (s.x.current(), s.y.current()))
            .unwrap_or((50.0, 50.0));

        let mut remaining: Vec<Option<Slot>> =
            std::mem::take(&mut self.slots).into_iter().map(Some).collect();
        let mut assigned: Vec<Option<Slot>> = desired.iter().map(|_| None).collect();

        for (i, (_, session)) in desired.iter().enumerate() {
            if let Some(session) = session {
                let matched = remaining.iter().position(|candidate| {
                    candidate
                        .as_ref()
                        .map_or(false, |slot| slot.session_id == Some(session.id))
                });
                if let Some(pos) = matched {
                    assigned[i] = remaining[pos].take();
                }
            }
        }

        let mut leftovers = remaining.into_iter().flatten();
        let mut slots = Vec::with_capacity(desired.len());
        for slot in assigned {
            match slot.or_else(|| leftovers.next()) {
                Some(slot) => slots.push(slot),
                None => {
                    let slot = Slot::spawn_at(self.next_id, anchor.0, anchor.1, &self.tuning);
                    self.next_id += 1;
                    slots.push(slot);
                }
            }
        }
        // any slots still in `leftovers` are the removed tail
        self.slots = slots;
    }

    /// Advance all springs by one pre-clamped step and refresh timer text
    /// from the reconciled elapsed baselines.
    pub fn advance(&mut self, dt: f32) {
        self.advance_at(dt, Instant::now());
    }

    pub fn advance_at(&mut self, dt: f32, now: Instant) {
        for slot in &mut self.slots {
            slot.advance(dt);
            if slot.kind == SlotKind::Used {
                if let Some(session_id) = slot.session_id {
                    if let Some(seconds) = self.tracker.elapsed(session_id, now) {
                        slot.timer = format_elapsed(seconds);
                    }
                }
            }
        }
    }

    /// Mark the open slot while a scan round-trip is in flight, and back.
    pub fn set_processing(&mut self, processing: bool) {
        let kind = if processing {
            SlotKind::Processing
        } else {
            SlotKind::Available
        };
        for slot in &mut self.slots {
            if matches!(slot.kind, SlotKind::Available | SlotKind::Processing) && slot.kind != kind
            {
                slot.retarget(kind, None);
            }
        }
    }

    /// Show a scan outcome until the next reconcile overrides it. Ban
    /// outcomes flash the affected slot; everything else just clears the
    /// in-flight mark.
    pub fn apply_scan(&mut self, result: &ScanResult) {
        if result.is_ban() {
            let target = self
                .slots
                .iter()
                .position(|s| s.kind == SlotKind::Used && s.name == result.name)
                .or_else(|| {
                    self.slots
                        .iter()
                        .position(|s| matches!(s.kind, SlotKind::Available | SlotKind::Processing))
                });
            if let Some(index) = target {
                self.slots[index].retarget(SlotKind::Banned, None);
            }
        } else {
            self.set_processing(false);
        }
    }

    /// While connectivity is lost, timers hold rather than advancing from
    /// stale data.
    pub fn set_timers_frozen(&mut self, frozen: bool) {
        self.tracker.set_frozen(frozen);
    }

    /// Drop everything, e.g. when switching rooms.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.queue.clear();
        self.tracker.reset();
        self.occupancy = 0;
        self.suspended = false;
    }

    /// Serializable view of the current visual state.
    pub fn frame(&self, connection: &str) -> Frame {
        Frame {
            connection: connection.to_string(),
            capacity: self.capacity,
            occupancy: self.occupancy,
            suspended: self.suspended,
            overdue_minutes: self.overdue_minutes,
            auto_ban_overdue: self.auto_ban_overdue,
            queue: self.queue.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| SlotFrame {
                    id: slot.id,
                    kind: slot.kind,
                    x: slot.x.current(),
                    y: slot.y.current(),
                    scale: slot.scale.current(),
                    rotation: slot.rotation.current(),
                    name: slot.name.clone(),
                    timer: slot.timer.clone(),
                    overdue: slot.overdue,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn queue(&self) -> &[String] {
        &self.queue
    }
}

fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
