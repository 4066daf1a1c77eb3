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

/// Error while processing the byte stream.
///
/// Every variant is terminal for the session; the driver answers all of them
/// with [`Event::Abort`](crate::Event::Abort).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// More bytes arrived than the operation allows.
    #[error("input is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Bytes read so far.
        got: usize,
    },
    /// The per-operation deadline fired.
    #[error("timed out after {after:?}")]
    TimedOut {
        /// The deadline that fired.
        after: std::time::Duration,
    },
    /// The peer closed the stream mid-operation.
    #[error("connection closed by the client")]
    Closed,
    /// Other IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
