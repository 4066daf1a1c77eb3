/*
 * tinsmtp SMTP conversation engine
 * Copyright (C) 2026 the tinsmtp authors
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

//! Server-side core of the SMTP protocol.
//!
//! This crate handles the grunt work of a reasonably RFC 5321 compliant SMTP
//! server: command parsing, command sequencing, STARTTLS, input limits. It
//! does not decide which senders, recipients or messages are acceptable;
//! those decisions belong to whatever drives it.
//!
//! Create a [`Session`] over a connected byte stream and repeatedly call
//! [`Session::next_event`]. Each [`Event::Command`] and [`Event::Data`] may
//! be answered with [`Session::accept`], [`Session::reject`] or
//! [`Session::tempfail`] (and their message-carrying variants); an event left
//! unanswered is accepted implicitly on the next call.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(
    clippy::missing_docs_in_private_items,
    clippy::pub_use,
    clippy::implicit_return,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
#![allow(clippy::std_instead_of_core)] // issue with thiserror

mod command;
mod error;
mod event;
mod reader;
mod session;
mod state;
mod trace;
mod writer;

pub use command::{parse_command, ParseError, ParsedLine, Verb};
pub use error::Error;
pub use event::Event;
pub use session::Session;
pub use state::State;

pub use tokio_rustls::rustls;
