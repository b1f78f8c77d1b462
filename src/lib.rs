//! Ferryman - WhatsApp-Telegram chat bridge
//!
//! Mirrors each WhatsApp contact into its own Telegram forum topic, runs
//! inbound messages through a plugin pipeline, and forwards topic replies
//! back to the contact.

pub mod bridge;
pub mod common;
pub mod config;
pub mod console;
pub mod plugins;
pub mod store;
pub mod telegram;
pub mod whatsapp;

#[cfg(test)]
pub mod testing;
