//! Omni Chat core library — session gate, conversation state, request dispatcher and
//! webhook client, used by both the CLI and desktop applications.

pub mod auth;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod init;
pub mod storage;
pub mod webhook;
