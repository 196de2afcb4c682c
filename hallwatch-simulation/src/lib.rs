pub mod frame;  // Serializable view of the pool for consuming surfaces
pub mod layout; // Pure count+viewport -> placements mapping
pub mod pool;   // Slot pool reconciliation and per-frame advancement
pub mod slot;   // One animated slot
pub mod spring; // Scalar damped spring integrator

// Re-export commonly used items
pub use frame::{Frame, SlotFrame};
pub use layout::{layout, Placement};
pub use pool::{SlotPool, Viewport};
pub use slot::SlotKind;
pub use spring::{Spring, SpringParams, SpringTuning};
