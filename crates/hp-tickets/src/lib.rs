//! Ticket tracking for Hephaestus: a data-driven status machine over a
//! workflow's `BoardConfig.columns`, blocking propagation, hybrid
//! semantic/full-text search, and the clarification arbitrator that caps
//! infinite task-creation loops.

pub mod ticket_service;

pub use ticket_service::{SearchHit, TicketService, TicketServiceError, TransitionOutcome};
