pub mod block;
pub mod chord;
pub mod pattern;
pub mod row;
pub mod track_queue;

pub use block::ArpBlock;
pub use chord::ChordShortcut;
pub use pattern::{ArpMode, BlockEffects, NotePattern, VariantOffset, VariantSlot, RATE_RANGE, VARIANT_SLOTS};
pub use row::{read_row, write_row, Instrument, Row, RowHandle};
pub use track_queue::TrackQueue;
