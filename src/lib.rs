//! Lead qualifier: WhatsApp leads classified by an LLM and recorded in a
//! Google Sheet, with a small dashboard API for human handoff.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod handoff;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod webhook;
