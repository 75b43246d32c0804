use serde::Serialize;
use tracing::info;

/// Occupancy of a fixed row of parking slots, numbered from 1.
#[derive(Debug, Clone)]
pub struct ParkingSlots {
    occupied: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: u32,
    pub occupied: bool,
}

impl ParkingSlots {
    pub fn new(count: usize) -> Self {
        Self {
            occupied: vec![false; count],
        }
    }

    fn index(&self, slot: u32) -> Result<usize, SlotError> {
        let idx = (slot as usize).wrapping_sub(1);
        if slot == 0 || idx >= self.occupied.len() {
            return Err(SlotError::Invalid(slot, self.occupied.len()));
        }
        Ok(idx)
    }

    pub fn park(&mut self, slot: u32) -> Result<(), SlotError> {
        let idx = self.index(slot)?;
        if self.occupied[idx] {
            return Err(SlotError::Occupied(slot));
        }
        self.occupied[idx] = true;
        info!(slot, "car parked");
        Ok(())
    }

    pub fn remove(&mut self, slot: u32) -> Result<(), SlotError> {
        let idx = self.index(slot)?;
        if !self.occupied[idx] {
            return Err(SlotError::Vacant(slot));
        }
        self.occupied[idx] = false;
        info!(slot, "car removed");
        Ok(())
    }

    /// Lowest-numbered vacant slot, if any.
    pub fn first_vacant(&self) -> Option<u32> {
        self.occupied
            .iter()
            .position(|taken| !taken)
            .map(|idx| idx as u32 + 1)
    }

    pub fn status(&self) -> Vec<SlotStatus> {
        self.occupied
            .iter()
            .enumerate()
            .map(|(idx, &occupied)| SlotStatus {
                slot: idx as u32 + 1,
                occupied,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid slot number {0} (lot has {1} slots)")]
    Invalid(u32, usize),
    #[error("slot {0} is already occupied")]
    Occupied(u32),
    #[error("slot {0} is already vacant")]
    Vacant(u32),
}
