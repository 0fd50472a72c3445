//! Discord interface for kingscribe.
//!
//! This crate is the bot's chat-platform face:
//! - **Gateway** (`gateway`) - transport trait + runner; the platform's event
//!   delivery and message rendering live behind it
//! - **Slash commands** (`commands`) - typed option parsing and the
//!   command-service seam
//! - **Events** (`events`) - envelope model and dispatcher
//! - **Templates** (`messages`) - embeds, buttons, menus, modals, files
//! - **Renderer** (`render`) - backend results to chat messages
//! - **Workflow** (`workflow`) - the interactive multi-step registration
//! - **Service** (`service`) - per-command glue over the backend client
//!
//! # Architecture
//!
//! ```text
//! Gateway events → EventDispatcher → Handlers → StatsCommandService → Backend
//!                        ↓                          ↓
//!                  RegistrationWorkflow       Renderer → chat
//! ```

pub mod commands;
pub mod events;
pub mod gateway;
pub mod messages;
pub mod render;
pub mod service;
pub mod workflow;
