//! Medication reminder and adherence-confirmation core.
//!
//! Doses move PENDING → REMINDED → FOLLOWUP → TAKEN during the day and back
//! to PENDING at local midnight. Time-driven transitions come from the
//! minute ticker; TAKEN comes from push self-reports, manual entry and voice
//! call answers. Every status write is a compare-and-swap on the prior status.

pub mod background;
pub mod channels;
pub mod confirmation;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod reset;
pub mod scheduler;
pub mod state_machine;
pub mod store;
pub mod traits;
pub mod types;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use background::{start_reminder_loop, ReminderLoopHandle};
pub use confirmation::DoseConfirmer;
pub use error::ReminderError;
pub use interpreter::SpeechInterpreter;
pub use reset::DailyReset;
pub use scheduler::ReminderTicker;
pub use store::SqliteReminderStore;
pub use traits::*;
pub use types::*;
pub use voice::{VoiceOutcome, VoiceReply, VoiceResponseHandler};
