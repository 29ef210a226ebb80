// SPDX-License-Identifier: CEPL-1.0
//! Submission tracking for user image uploads.
//!
//! Each upload's transfer commands go out with exactly one frame. The staging
//! memory behind them can be released once that frame's slot fence signals.
use crate::error::UploadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Submitted { slot: usize },
}

#[derive(Debug, Clone)]
struct Entry {
    id: UploadId,
    image_slot: u32,
    state: UploadState,
}

#[derive(Debug, Default, Clone)]
pub struct UploadQueue {
    entries: Vec<Entry>,
    next_id: u64,
}

/// Checks an upload request before any GPU object is created for it.
pub fn validate_upload(
    image_slot: u32,
    width: u32,
    height: u32,
    len: usize,
    user_image_max: u32,
    max_dim: u32,
) -> Result<(), UploadError> {
    if image_slot >= user_image_max {
        return Err(UploadError::SlotOutOfRange {
            slot: image_slot,
            max: user_image_max,
        });
    }
    if width == 0 || height == 0 || width > max_dim || height > max_dim {
        return Err(UploadError::BadExtent {
            width,
            height,
            limit: max_dim,
        });
    }
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(UploadError::SizeMismatch {
            width,
            height,
            expected,
            got: len,
        });
    }
    Ok(())
}

impl UploadQueue {
    pub fn enqueue(&mut self, image_slot: u32) -> UploadId {
        let id = UploadId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            image_slot,
            state: UploadState::Pending,
        });
        id
    }

    pub fn state(&self, id: UploadId) -> Option<UploadState> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.state)
    }

    /// Pending uploads targeting `image_slot`, oldest first.
    pub fn pending_for(&self, image_slot: u32) -> impl Iterator<Item = UploadId> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.image_slot == image_slot && e.state == UploadState::Pending)
            .map(|e| e.id)
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|e| e.state == UploadState::Pending)
    }

    /// Hands out every pending upload for submission with `frame_slot`'s
    /// frame. An upload is handed out once only.
    pub fn take_pending(&mut self, frame_slot: usize) -> Vec<UploadId> {
        self.entries
            .iter_mut()
            .filter(|e| e.state == UploadState::Pending)
            .map(|e| {
                e.state = UploadState::Submitted { slot: frame_slot };
                e.id
            })
            .collect()
    }

    /// Drops a still-pending upload. Returns false if it was already submitted
    /// or is unknown.
    pub fn cancel(&mut self, id: UploadId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.id == id && e.state == UploadState::Pending));
        self.entries.len() != before
    }

    /// Puts uploads handed out by the last `take_pending` back in the queue
    /// after the submit carrying them failed.
    pub fn restore(&mut self, ids: &[UploadId]) {
        for e in self.entries.iter_mut().filter(|e| ids.contains(&e.id)) {
            e.state = UploadState::Pending;
        }
    }

    /// Drops uploads submitted with `frame_slot` once its fence has signaled.
    /// Returns them so their staging resources can be freed.
    pub fn retire(&mut self, frame_slot: usize) -> Vec<UploadId> {
        let mut done = Vec::new();
        self.entries.retain(|e| {
            if e.state == (UploadState::Submitted { slot: frame_slot }) {
                done.push(e.id);
                false
            } else {
                true
            }
        });
        done
    }

    /// Drops everything, for teardown after the device is idle.
    pub fn drain(&mut self) -> Vec<UploadId> {
        self.entries.drain(..).map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
