// Per-client rate limiting for inbound chat messages.
//
// The limiter is a fixed-window counter keyed by client identity. Window
// state lives behind the WindowStore trait so the in-memory table can be
// swapped for a shared cache without touching the relay pipeline.

pub mod limiter;
pub mod store;
