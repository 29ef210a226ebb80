// SPDX-License-Identifier: CEPL-1.0
//! CPU side of the frames-in-flight protocol.
//!
//! The ring owns no GPU objects. It tracks which slot the next frame uses,
//! whether that slot's fence is known to be signaled, and where the current
//! frame is in its acquire/submit/present cycle. The backend drives it and
//! refuses CPU writes the ring says are unsafe.
use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence observed signaled; the CPU may write this slot's staging memory.
    Signaled,
    /// Submitted and not yet waited on.
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Waiting,
    Acquiring,
    Submitted,
    Presented,
}

/// Result of one `submit` call as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The swapchain was rebuilt; if nothing was submitted the frame is
    /// retried on the next call with the same slot.
    SwapchainRebuilt,
    /// Submitted but not shown; logged and dropped.
    Skipped,
    /// Zero-sized surface, nothing submitted.
    Paused,
}

#[derive(Debug, Clone)]
pub struct FrameRing {
    slots: Vec<SlotState>,
    frame_count: u64,
    phase: FramePhase,
    /// A swapchain image is held by the current frame.
    holds_image: bool,
    /// Queue work no fence covers (presents, released acquires) may be pending.
    unfenced_work: bool,
}

/// Slot whose layers `slot` samples as the previous frame. With one slot the
/// slot feeds itself.
pub fn feedback_slot(slot: usize, fifo: usize) -> usize {
    let fifo = fifo.max(1);
    (slot % fifo + fifo - 1) % fifo
}

impl FrameRing {
    /// Fences start signaled, so every slot starts writable.
    pub fn new(fifo: usize) -> Self {
        FrameRing {
            slots: vec![SlotState::Signaled; fifo.max(1)],
            frame_count: 0,
            phase: FramePhase::Idle,
            holds_image: false,
            unfenced_work: false,
        }
    }

    pub fn fifo(&self) -> usize {
        self.slots.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn current_slot(&self) -> usize {
        (self.frame_count % self.slots.len() as u64) as usize
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn feedback_slot(&self, slot: usize) -> usize {
        feedback_slot(slot, self.slots.len())
    }

    pub fn holds_image(&self) -> bool {
        self.holds_image
    }

    /// True while presents or released acquires may still reference
    /// swapchain semaphores. Only a queue idle clears it.
    pub fn has_unfenced_work(&self) -> bool {
        self.unfenced_work
    }

    pub fn queue_idle(&mut self) {
        self.unfenced_work = false;
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots[slot]
    }

    pub fn in_flight(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == SlotState::InFlight)
            .map(|(i, _)| i)
    }

    /// Guard for CPU writes into `slot`'s staging memory.
    pub fn ensure_writable(&self, slot: usize) -> Result<(), ScheduleError> {
        match self.slots[slot] {
            SlotState::Signaled => Ok(()),
            SlotState::InFlight => Err(ScheduleError::SlotInFlight { slot }),
        }
    }

    pub fn mark_signaled(&mut self, slot: usize) {
        self.slots[slot] = SlotState::Signaled;
    }

    fn step(&mut self, from: &[FramePhase], to: FramePhase) -> Result<(), ScheduleError> {
        if !from.contains(&self.phase) {
            return Err(ScheduleError::Phase {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    /// Idle -> Waiting. The caller waits the current slot's fence next.
    pub fn begin_frame(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Idle], FramePhase::Waiting)
    }

    /// Waiting -> Acquiring, current slot now writable.
    pub fn fence_signaled(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Waiting], FramePhase::Acquiring)?;
        let slot = self.current_slot();
        self.mark_signaled(slot);
        Ok(())
    }

    /// An image was acquired for the current frame; stays in Acquiring.
    pub fn image_acquired(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Acquiring], FramePhase::Acquiring)?;
        self.holds_image = true;
        Ok(())
    }

    /// Frame dropped before submit: back to Idle on the same slot. A held
    /// image is released by the caller with a wait-only submit.
    pub fn abandon(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Waiting, FramePhase::Acquiring], FramePhase::Idle)?;
        if self.holds_image {
            self.holds_image = false;
            self.unfenced_work = true;
        }
        Ok(())
    }

    /// Acquiring -> Submitted; the current slot is in flight until waited.
    pub fn submitted(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Acquiring], FramePhase::Submitted)?;
        self.holds_image = false;
        let slot = self.current_slot();
        self.slots[slot] = SlotState::InFlight;
        Ok(())
    }

    /// Submitted -> Presented. Called whether or not present succeeded.
    pub fn presented(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Submitted], FramePhase::Presented)?;
        self.unfenced_work = true;
        Ok(())
    }

    /// Presented -> Idle on the next slot.
    pub fn advance(&mut self) -> Result<(), ScheduleError> {
        self.step(&[FramePhase::Presented], FramePhase::Idle)?;
        self.frame_count += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
