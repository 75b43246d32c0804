use platewatch_common::plate::PlateRecord;

/// Supplies the slot number announced with a recognized plate.
pub trait SlotProvider: Send {
    fn slot_for(&mut self, record: &PlateRecord) -> u32;
}

/// Announces every plate with the same configured slot.
pub struct FixedSlot(pub u32);

impl SlotProvider for FixedSlot {
    fn slot_for(&mut self, _record: &PlateRecord) -> u32 {
        self.0
    }
}
