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

use crate::Error;
use tokio::io::AsyncReadExt;

/// Byte cap on one command line. Much bigger than the RFC requires.
const CMD_LINE_MAX: usize = 2048;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

/// Bounded line and body reader over a borrowed byte stream.
///
/// The buffer carries over between operations, so commands a pipelining
/// client sent ahead of time are drained before the stream is read again.
/// Byte caps count fresh stream bytes only and are re-armed per operation.
pub(crate) struct LineReader {
    buffer: bytes::BytesMut,
    additional_reserve: usize,
}

impl LineReader {
    pub(crate) fn new() -> Self {
        Self {
            buffer: bytes::BytesMut::with_capacity(80),
            additional_reserve: 100,
        }
    }

    /// Drop everything buffered. Required after a TLS upgrade; plaintext
    /// read ahead of the handshake must not leak into the secured session.
    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Read one command line, without its terminator.
    ///
    /// The whole operation runs under `deadline` and a fresh-byte cap of
    /// `CMD_LINE_MAX`. Lines end on `\n`; a preceding `\r` is stripped, so
    /// both CR-LF and a bare LF from sloppy clients work.
    pub(crate) async fn read_line<R>(
        &mut self,
        io: &mut R,
        deadline: std::time::Duration,
    ) -> Result<String, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        tokio::time::timeout(deadline, self.fill_line(io))
            .await
            .map_err(|_elapsed| Error::TimedOut { after: deadline })?
    }

    async fn fill_line<R>(&mut self, io: &mut R) -> Result<String, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut fresh = 0;

        loop {
            if let Some(pos) = find(&self.buffer, b"\n") {
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if fresh >= CMD_LINE_MAX {
                return Err(Error::BufferTooLong {
                    expected: CMD_LINE_MAX,
                    got: fresh,
                });
            }

            self.buffer.reserve(self.additional_reserve);
            let read_size = io.read_buf(&mut self.buffer).await?;
            if read_size == 0 {
                return Err(Error::Closed);
            }
            fresh += read_size;
        }
    }

    /// Read a dot-terminated message body, RFC 5321 §4.5.2.
    ///
    /// A line holding only `.` ends the body and is not part of it; any
    /// other line starting with `.` loses that first dot. Line endings stay
    /// as the client sent them. The whole operation runs under `deadline`
    /// and a fresh-byte cap of `size_limit`.
    pub(crate) async fn read_body<R>(
        &mut self,
        io: &mut R,
        deadline: std::time::Duration,
        size_limit: usize,
    ) -> Result<Vec<u8>, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        tokio::time::timeout(deadline, self.fill_body(io, size_limit))
            .await
            .map_err(|_elapsed| Error::TimedOut { after: deadline })?
    }

    async fn fill_body<R>(&mut self, io: &mut R, size_limit: usize) -> Result<Vec<u8>, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut body = Vec::new();
        let mut fresh = 0;

        loop {
            while let Some(pos) = find(&self.buffer, b"\n") {
                let line = self.buffer.split_to(pos + 1);
                let bare = if line.ends_with(b"\r\n") {
                    &line[..line.len() - 2]
                } else {
                    &line[..line.len() - 1]
                };
                if bare == b"." {
                    // The terminating line still counts against the cap, as
                    // does anything the stream handed us past it.
                    if fresh >= size_limit {
                        return Err(Error::BufferTooLong {
                            expected: size_limit,
                            got: fresh,
                        });
                    }
                    return Ok(body);
                }
                if line.first() == Some(&b'.') {
                    body.extend_from_slice(&line[1..]);
                } else {
                    body.extend_from_slice(&line);
                }
            }
            if fresh >= size_limit {
                return Err(Error::BufferTooLong {
                    expected: size_limit,
                    got: fresh,
                });
            }

            self.buffer.reserve(self.additional_reserve);
            let read_size = io.read_buf(&mut self.buffer).await?;
            if read_size == 0 {
                return Err(Error::Closed);
            }
            fresh += read_size;
        }
    }
}
