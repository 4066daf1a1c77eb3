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

use crate::{trace::Trace, Error};
use tinsmtp_common::Reply;
use tokio::io::AsyncWriteExt;

/// Writes SMTP replies to a borrowed byte stream.
///
/// When `delay` is non-zero every byte is written on its own with `delay` of
/// sleep after it. That is a deliberate way to slow down spam clients, and it
/// interacts with their timeouts; keep it off for regular mail.
pub(crate) struct ReplyWriter {
    reply_out: std::time::Duration,
    delay: std::time::Duration,
}

impl ReplyWriter {
    pub(crate) const fn new(reply_out: std::time::Duration, delay: std::time::Duration) -> Self {
        Self { reply_out, delay }
    }

    /// Send a reply, one wire line at a time.
    ///
    /// Each line is traced as `w` before it goes out, and written under a
    /// deadline of `reply_out` plus `delay` per byte. The first failed line
    /// stops the rest.
    pub(crate) async fn send<W>(
        &self,
        io: &mut W,
        trace: &mut Trace,
        reply: &Reply,
    ) -> Result<(), Error>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        for line in reply.lines() {
            trace.line('w', &line);

            let wire = [line.as_bytes(), b"\r\n"].concat();
            let deadline = self.reply_out + self.delay * u32::try_from(wire.len()).unwrap_or(0);
            tokio::time::timeout(deadline, self.put(io, &wire))
                .await
                .map_err(|_elapsed| Error::TimedOut { after: deadline })??;
        }
        Ok(())
    }

    async fn put<W>(&self, io: &mut W, wire: &[u8]) -> std::io::Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        if self.delay.is_zero() {
            io.write_all(wire).await?;
        } else {
            for byte in wire {
                io.write_all(std::slice::from_ref(byte)).await?;
                tokio::time::sleep(self.delay).await;
            }
        }
        io.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::ReplyWriter;
    use crate::trace::Trace;
    use tinsmtp_common::Reply;

    const OUT: std::time::Duration = std::time::Duration::from_secs(5);

    #[tokio::test]
    async fn writes_multi_line_wire_form() {
        let writer = ReplyWriter::new(OUT, std::time::Duration::ZERO);
        let mut io = std::io::Cursor::new(Vec::new());
        let mut trace = Trace::new(None);

        writer
            .send(&mut io, &mut trace, &Reply::new(250, "a\nb"))
            .await
            .unwrap();

        pretty_assertions::assert_eq!(
            String::from_utf8(io.into_inner()).unwrap(),
            "250-a\r\n250 b\r\n"
        );
    }

    #[tokio::test]
    async fn paced_writes_produce_the_same_bytes() {
        let writer = ReplyWriter::new(OUT, std::time::Duration::from_micros(10));
        let mut io = std::io::Cursor::new(Vec::new());
        let mut trace = Trace::new(None);

        writer
            .send(&mut io, &mut trace, &Reply::new(221, "Goodbye"))
            .await
            .unwrap();

        pretty_assertions::assert_eq!(
            String::from_utf8(io.into_inner()).unwrap(),
            "221 Goodbye\r\n"
        );
    }
}
