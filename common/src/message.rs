use crate::plate::PlateRecord;

/// A plate announcement sent to the parking consumer.
///
/// Wire format (UTF-8, one message per TCP connection, no length prefix):
///
/// ```text
/// {plate_text}\n{slot_number}
/// ```
///
/// The sender closes the connection after writing; nothing is read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub plate_text: String,
    pub slot_number: u32,
}

impl NotificationMessage {
    pub fn new(plate_text: impl Into<String>, slot_number: u32) -> Self {
        Self {
            plate_text: plate_text.into(),
            slot_number,
        }
    }

    /// Build the announcement for a record, or `None` if its text is empty.
    pub fn for_record(record: &PlateRecord, slot_number: u32) -> Option<Self> {
        record
            .is_announceable()
            .then(|| Self::new(record.text.clone(), slot_number))
    }

    pub fn encode(&self) -> Vec<u8> {
        format!("{}\n{}", self.plate_text, self.slot_number).into_bytes()
    }

    /// Parse a received payload. The first line is the plate, the second the slot.
    /// Both must be non-empty; the slot is trimmed before parsing.
    pub fn decode(data: &[u8]) -> Result<Self, MessageError> {
        let text = std::str::from_utf8(data).map_err(|_| MessageError::NotUtf8)?;
        let mut lines = text.lines();

        let plate_text = match lines.next() {
            Some(p) if !p.is_empty() => p,
            _ => return Err(MessageError::MissingPlate),
        };
        let slot_raw = match lines.next() {
            Some(s) if !s.is_empty() => s,
            _ => return Err(MessageError::MissingSlot),
        };
        let slot_number = slot_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| MessageError::InvalidSlot(slot_raw.to_string()))?;

        Ok(Self {
            plate_text: plate_text.to_string(),
            slot_number,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("payload has no plate line")]
    MissingPlate,
    #[error("payload has no slot line")]
    MissingSlot,
    #[error("slot is not a number: {0:?}")]
    InvalidSlot(String),
}
