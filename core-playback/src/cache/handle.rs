//! In-memory handle table
//!
//! Every successful resolve hands out one [`ResolvedHandle`] and bumps the
//! usage count of the slot for that track. A slot whose count drops to zero
//! stays resolvable for a cooldown window and is then revoked, so quickly
//! re-selecting a track does not touch storage at all.

use bytes::Bytes;
use core_library::TrackId;
use std::collections::HashMap;
use std::fmt;

/// Play-ready payload bytes for one track.
///
/// Each value accounts for one use of the underlying slot and must be given
/// back through `ResourceCache::release`.
pub struct ResolvedHandle {
    track: TrackId,
    payload: Bytes,
    slot: u64,
}

impl ResolvedHandle {
    pub fn track(&self) -> &TrackId {
        &self.track
    }

    /// Encoded payload. Never empty.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub(crate) fn slot(&self) -> u64 {
        self.slot
    }
}

impl fmt::Debug for ResolvedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandle")
            .field("track", &self.track)
            .field("len", &self.payload.len())
            .field("slot", &self.slot)
            .finish()
    }
}

#[derive(Debug)]
struct Slot {
    id: u64,
    payload: Bytes,
    usage: usize,
    /// Bumped every time usage reaches zero; a pending revocation only
    /// applies if it still matches.
    release_seq: u64,
}

/// Usage-counted slots keyed by track.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    slots: HashMap<TrackId, Slot>,
    next_slot: u64,
}

/// A slot that went idle and should be revoked after the cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRevocation {
    pub track: TrackId,
    pub slot: u64,
    pub seq: u64,
}

impl HandleTable {
    /// New handle on an existing slot, if there is one.
    pub fn acquire(&mut self, track: &TrackId) -> Option<ResolvedHandle> {
        let slot = self.slots.get_mut(track)?;
        slot.usage += 1;
        Some(ResolvedHandle {
            track: track.clone(),
            payload: slot.payload.clone(),
            slot: slot.id,
        })
    }

    /// New handle for freshly loaded bytes. If another resolve filled the
    /// slot in the meantime, that slot is shared instead.
    pub fn insert(&mut self, track: &TrackId, payload: Bytes) -> ResolvedHandle {
        if let Some(handle) = self.acquire(track) {
            return handle;
        }

        self.next_slot += 1;
        let id = self.next_slot;
        self.slots.insert(
            track.clone(),
            Slot {
                id,
                payload: payload.clone(),
                usage: 1,
                release_seq: 0,
            },
        );

        ResolvedHandle {
            track: track.clone(),
            payload,
            slot: id,
        }
    }

    /// Give back one use. Returns the revocation to schedule when the slot
    /// went idle.
    pub fn release(&mut self, handle: &ResolvedHandle) -> Option<PendingRevocation> {
        let slot = self.slots.get_mut(&handle.track)?;
        if slot.id != handle.slot || slot.usage == 0 {
            return None;
        }

        slot.usage -= 1;
        if slot.usage > 0 {
            return None;
        }

        slot.release_seq += 1;
        Some(PendingRevocation {
            track: handle.track.clone(),
            slot: slot.id,
            seq: slot.release_seq,
        })
    }

    /// Drop the slot if it is still idle since `pending` was issued.
    pub fn revoke_if_idle(&mut self, pending: &PendingRevocation) -> bool {
        let still_idle = self.slots.get(&pending.track).map_or(false, |slot| {
            slot.id == pending.slot && slot.usage == 0 && slot.release_seq == pending.seq
        });

        if still_idle {
            self.slots.remove(&pending.track);
        }
        still_idle
    }

    /// Drop every idle slot immediately. Returns how many were dropped.
    pub fn revoke_idle(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.usage > 0);
        before - self.slots.len()
    }

    pub fn live(&self) -> usize {
        self.slots.len()
    }

    pub fn usage(&self, track: &TrackId) -> usize {
        self.slots.get(track).map_or(0, |slot| slot.usage)
    }
}
