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

use crate::Verb;

/// High-level events returned by [`Session::next_event`](crate::Session::next_event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An envelope command arrived: HELO, EHLO, MAIL FROM, RCPT TO or DATA.
    /// Everything else is handled internally.
    Command {
        /// The verb.
        verb: Verb,
        /// Its normalized argument. May be empty for HELO/EHLO (a blank
        /// greeting) and for MAIL FROM (the null sender `<>`), never for
        /// RCPT TO.
        arg: String,
    },
    /// The message body arrived, dot-unstuffed, line endings intact. The
    /// caller owes it a reply.
    Data(Vec<u8>),
    /// The client quit cleanly and the channel is closed.
    Done,
    /// The session died: stream error, deadline, or too many bad commands.
    Abort,
    /// STARTTLS was acknowledged but the handshake failed. The next event
    /// will be [`Event::Abort`].
    TlsError,
}
