pub mod gate;
pub mod store;

pub use gate::{Ticket, Turn, TurnGate};
pub use store::{ChatStore, apply_preferred_prompt, apply_system_prompt, resolve_system_prompt};
