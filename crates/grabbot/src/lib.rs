//! grabbot - Telegram front end for the grabcore retrieval engine
//!
//! A user posts a link, picks audio or video from an inline keyboard, and gets
//! the file back. Everything between the pick and the upload lives in
//! `grabcore`; this crate is the Telegram side of it plus the CLI.

pub mod cli;
pub mod telegram;
