use serde::Serialize;

use crate::slot::SlotKind;

/// One slot, ready to draw.
#[derive(Serialize, Debug, Clone)]
pub struct SlotFrame {
    pub id: u64,
    pub kind: SlotKind,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub rotation: f32,
    pub name: String,
    pub timer: String,
    pub overdue: bool,
}

/// Complete display state for one emitted frame. Consuming surfaces draw
/// this verbatim; nothing here requires further server state.
#[derive(Serialize, Debug, Clone)]
pub struct Frame {
    pub connection: String,
    pub capacity: u32,
    pub occupancy: u32,
    pub suspended: bool,
    pub overdue_minutes: u32,
    pub auto_ban_overdue: bool,
    pub queue: Vec<String>,
    pub slots: Vec<SlotFrame>,
}
