// Chatguard: a moderated streaming relay for a hosted chat model.
//
// This is the library root. Each module corresponds to a stage or seam of
// the relay: rate limiting, moderation, generation, the pipeline that runs
// them in order, and the HTTP front.

pub mod config;
pub mod generation;
pub mod moderation;
pub mod output;
pub mod ratelimit;
pub mod relay;
pub mod web;
