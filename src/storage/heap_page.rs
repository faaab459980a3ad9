//! Slotted heap page: occupancy bitmap header plus fixed-width tuple slots.
//!
//! For a tuple width of `w` bytes the page holds
//! `num_slots = floor(PAGE_SIZE * 8 / (w * 8 + 1))` slots, preceded by a
//! bitmap of `ceil(num_slots / 8)` bytes where bit `i` (LSB-first within each
//! byte) marks slot `i` occupied. The byte buffer *is* the serialized form,
//! so a page round-trips through disk byte-identically.

use crate::access::schema::TupleDesc;
use crate::access::tuple::{RecordId, Tuple};
use crate::error::{EngineError, Result};
use crate::storage::page::{PageId, PAGE_SIZE};
use crate::transaction::TransactionId;

#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    desc: TupleDesc,
    data: Box<[u8; PAGE_SIZE]>,
    /// Transaction that dirtied this page, if any.
    dirtier: Option<TransactionId>,
}

/// Slots that fit a page for the given tuple width.
pub fn num_slots_for(tuple_width: usize) -> usize {
    PAGE_SIZE * 8 / (tuple_width * 8 + 1)
}

impl HeapPage {
    /// Fresh all-empty page.
    pub fn new(pid: PageId, desc: TupleDesc) -> Self {
        Self {
            pid,
            desc,
            data: Box::new([0u8; PAGE_SIZE]),
            dirtier: None,
        }
    }

    /// Deserializes a page read from disk. `bytes` must be exactly
    /// [`PAGE_SIZE`] long.
    pub fn from_bytes(pid: PageId, desc: TupleDesc, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(EngineError::Corrupted(format!(
                "page {} has {} bytes, expected {}",
                pid,
                bytes.len(),
                PAGE_SIZE
            )));
        }
        let mut data = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(bytes);
        Ok(Self {
            pid,
            desc,
            data,
            dirtier: None,
        })
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    /// Re-identifies the page after compaction renumbers it. Only the buffer
    /// pool may call this, under its cache mutex.
    pub(crate) fn set_pid(&mut self, pid: PageId) {
        self.pid = pid;
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// The serialized form: the raw buffer.
    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn num_slots(&self) -> usize {
        num_slots_for(self.desc.byte_width())
    }

    fn header_size(&self) -> usize {
        self.num_slots().div_ceil(8)
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let width = self.desc.byte_width();
        let start = self.header_size() + slot * width;
        start..start + width
    }

    pub fn slot_occupied(&self, slot: usize) -> bool {
        self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, occupied: bool) {
        if occupied {
            self.data[slot / 8] |= 1 << (slot % 8);
        } else {
            self.data[slot / 8] &= !(1 << (slot % 8));
        }
    }

    pub fn empty_slot_count(&self) -> usize {
        (0..self.num_slots()).filter(|&s| !self.slot_occupied(s)).count()
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.empty_slot_count() == self.num_slots()
    }

    /// Writes `tuple` into the lowest-indexed free slot and stamps its
    /// record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<()> {
        if tuple.desc() != &self.desc {
            return Err(EngineError::SchemaMismatch {
                context: format!(
                    "tuple schema {} does not match page schema {}",
                    tuple.desc(),
                    self.desc
                ),
            });
        }
        let slot = (0..self.num_slots())
            .find(|&s| !self.slot_occupied(s))
            .ok_or(EngineError::PageFull { pid: self.pid })?;

        let range = self.slot_range(slot);
        let mut target = &mut self.data[range];
        tuple.write_to(&mut target)?;
        self.set_slot(slot, true);
        tuple.set_record_id(Some(RecordId::new(self.pid, slot as u16)));
        Ok(())
    }

    /// Clears the slot recorded in the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(EngineError::NoRecordId)?;
        if rid.page_id != self.pid {
            return Err(EngineError::Corrupted(format!(
                "record id {} does not refer to page {}",
                rid, self.pid
            )));
        }
        let slot = rid.slot as usize;
        if slot >= self.num_slots() || !self.slot_occupied(slot) {
            return Err(EngineError::SlotEmpty {
                pid: self.pid,
                slot: rid.slot,
            });
        }
        self.set_slot(slot, false);
        Ok(())
    }

    /// Occupied tuples in slot order, record ids stamped.
    pub fn tuples(&self) -> Result<Vec<Tuple>> {
        let mut out = Vec::new();
        for slot in 0..self.num_slots() {
            if !self.slot_occupied(slot) {
                continue;
            }
            let range = self.slot_range(slot);
            let mut source = &self.data[range];
            let mut tuple = Tuple::read_from(&mut source, &self.desc)?;
            tuple.set_record_id(Some(RecordId::new(self.pid, slot as u16)));
            out.push(tuple);
        }
        Ok(out)
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }
}
