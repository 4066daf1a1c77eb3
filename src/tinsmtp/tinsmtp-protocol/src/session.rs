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

use crate::{
    command::{parse_command, ParsedLine, Verb},
    event::Event,
    reader::LineReader,
    state::{sequencing, State},
    trace::{stamp, Trace},
    writer::ReplyWriter,
};
use tinsmtp_common::{Config, Reply};
use tokio_rustls::rustls;

/// The byte stream a session runs over. Swapped out wholesale when STARTTLS
/// re-frames the connection.
trait Tunnel: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}
impl<T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> Tunnel for T {}

/// One ongoing SMTP conversation.
///
/// Drive it by calling [`Session::next_event`] until it returns
/// [`Event::Done`] or [`Event::Abort`]. Every [`Event::Command`] and
/// [`Event::Data`] may be answered through the accept/reject/tempfail
/// methods before the next call; an unanswered event is accepted with the
/// default reply.
///
/// The session advertises PIPELINING and 8BITMIME, and STARTTLS when a TLS
/// configuration was provided and the stream is not yet secured. It never
/// advertises SIZE (the body cap counts raw bytes, not the RFC 1870 measure)
/// nor AUTH.
pub struct Session {
    tunnel: Box<dyn Tunnel>,
    reader: LineReader,
    writer: ReplyWriter,
    trace: Trace,
    config: Config,
    tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    client_addr: std::net::SocketAddr,

    state: State,
    next_state: State,
    bad_cmds: usize,

    // Bookkeeping for accept()/reject()/tempfail().
    cur_cmd: Option<Verb>,
    replied: bool,

    tls_on: bool,
    tls_cipher: Option<rustls::CipherSuite>,
}

/// True when the parameter string is what a client exploiting our 8BITMIME
/// advertisement sends on MAIL FROM.
fn mime_param(line: &ParsedLine) -> bool {
    line.verb == Verb::MailFrom && (line.params == "BODY=7BIT" || line.params == "BODY=8BITMIME")
}

/// The 250 block answering EHLO.
fn ehlo_reply(local_name: &str, remote: std::net::SocketAddr, advertise_starttls: bool) -> Reply {
    let mut text = format!("{local_name} Hello {remote}\n8BITMIME\nPIPELINING");
    if advertise_starttls {
        text.push_str("\nSTARTTLS");
    }
    text.push_str("\nHELP");
    Reply::new(250, text)
}

impl Session {
    /// Create a new SMTP conversation over a connected byte stream.
    ///
    /// `client_addr` is the peer address, shown in greetings and trace
    /// markers. TLS is offered to the client only when `tls_config` is
    /// given. A trace of SMTP commands and replies (but not message bodies)
    /// is written to `log` when one is given.
    ///
    /// An empty `local_name` or `sft_name` in the configuration falls back
    /// to the defaults.
    #[must_use]
    pub fn new(
        stream: impl tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
        client_addr: std::net::SocketAddr,
        mut config: Config,
        tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
        log: Option<Box<dyn std::io::Write + Send>>,
    ) -> Self {
        if config.local_name.is_empty() {
            config.local_name = Config::default_local_name();
        }
        if config.sft_name.is_empty() {
            config.sft_name = Config::default_sft_name();
        }
        Self {
            tunnel: Box::new(stream),
            reader: LineReader::new(),
            writer: ReplyWriter::new(config.limits.reply_out, config.delay),
            trace: Trace::new(log),
            config,
            tls_config,
            client_addr,
            state: State::Startup,
            next_state: State::Startup,
            bad_cmds: 0,
            cur_cmd: None,
            replied: true,
            tls_on: false,
            tls_cipher: None,
        }
    }

    /// Whether the stream has been upgraded to TLS.
    #[must_use]
    pub const fn tls_active(&self) -> bool {
        self.tls_on
    }

    /// The cipher suite negotiated by the STARTTLS handshake, if one
    /// happened.
    #[must_use]
    pub const fn tls_cipher(&self) -> Option<rustls::CipherSuite> {
        self.tls_cipher
    }

    /// Return the next high-level event of the conversation.
    ///
    /// Protocol ordering is enforced here; only HELO/EHLO, MAIL FROM,
    /// RCPT TO and DATA commands surface, plus the message body itself.
    /// Whoever drives the session must reset what it gathered about a
    /// transaction when it sees HELO/EHLO or MAIL FROM again.
    ///
    /// Little is checked about argument values: HELO/EHLO may be blank, a
    /// blank MAIL FROM is the null sender. Only `RCPT TO:<>` is refused
    /// internally. Everything further is for the caller to reject or
    /// tempfail.
    ///
    /// Calling again after [`Event::Done`] or [`Event::Abort`] returns the
    /// terminal event again.
    pub async fn next_event(&mut self) -> Event {
        // The previous event was left unanswered; give the default reply.
        if !self.replied && self.cur_cmd.is_some() {
            self.accept().await;
        }

        if self.state == State::Startup {
            self.state = State::Initial;
            let now = time::OffsetDateTime::now_utc();
            // The marker precedes the banner in case the banner write dies.
            self.trace.line(
                '#',
                &format!("remote {} at {}", self.client_addr, stamp(now)),
            );
            self.say(Reply::new(220, self.banner(now))).await;
        }

        if self.state == State::Data {
            match self
                .reader
                .read_body(
                    &mut self.tunnel,
                    self.config.limits.msg_input,
                    self.config.limits.msg_size,
                )
                .await
            {
                Ok(body) => {
                    self.trace.line('r', ". <end of data>");
                    if !body.is_empty() {
                        // Only a successful body ends the mail transaction;
                        // the next one must start over at MAIL FROM.
                        self.replied = false;
                        self.state = State::PostData;
                        self.next_state = State::Helo;
                        return Event::Data(body);
                    }
                }
                Err(e) => {
                    self.trace.line('!', &format!("DATA abort: {e}"));
                    self.state = State::Abort;
                }
            }
        }

        loop {
            if self.state == State::Abort
                || self.state == State::Quit
                || self.bad_cmds > self.config.limits.bad_cmds
            {
                break;
            }

            let line = match self
                .reader
                .read_line(&mut self.tunnel, self.config.limits.cmd_input)
                .await
            {
                Ok(line) => line,
                Err(e) => {
                    self.trace.line('!', &format!("command abort: {e}"));
                    self.state = State::Abort;
                    break;
                }
            };
            self.trace.line('r', &line);
            if line.is_empty() {
                break;
            }

            let parsed = parse_command(&line);
            if parsed.verb == Verb::Unknown {
                self.bad_cmds += 1;
                let why = parsed.error.map(|e| e.to_string()).unwrap_or_default();
                self.say(Reply::new(501, format!("Bad: {why}"))).await;
                continue;
            }

            // Out of sequence commands are not counted as bad: pipelining
            // legitimately produces them when an earlier command failed.
            let seq = sequencing(parsed.verb);
            if let Some(seq) = seq {
                if !seq.allows(self.state) {
                    self.say(Reply::new(503, "Out of sequence command")).await;
                    continue;
                }
            }

            if let Some(why) = parsed.error {
                self.say(Reply::new(553, format!("Garbled command: {why}")))
                    .await;
                continue;
            }

            let Some(seq) = seq else {
                if let Some(event) = self.run_unsequenced(parsed.verb).await {
                    return event;
                }
                continue;
            };

            self.next_state = seq.next;
            self.replied = false;
            self.cur_cmd = Some(parsed.verb);

            // The null recipient is never legal; everything else about
            // addresses is the caller's business.
            if parsed.verb == Verb::RcptTo && parsed.arg.is_empty() {
                self.reject().await;
                continue;
            }
            // Refuse ESMTP parameters when configured to, with the
            // RFC-correct reply rather than a generic rejection. The two
            // BODY= values our 8BITMIME advertisement invites must pass.
            if !parsed.params.is_empty() && self.config.limits.no_params && !mime_param(&parsed) {
                self.say(Reply::new(504, "Command parameter not implemented"))
                    .await;
                self.replied = true;
                continue;
            }

            return Event::Command {
                verb: parsed.verb,
                arg: parsed.arg,
            };
        }

        if self.bad_cmds > self.config.limits.bad_cmds {
            // An out of sequence reply, but the client will see it if it
            // sends anything more, and it belongs in the trace.
            self.say(Reply::new(554, "Too many bad commands")).await;
            self.state = State::Abort;
        }
        let now = time::OffsetDateTime::now_utc();
        if self.state == State::Quit {
            self.trace.line('#', &format!("finished at {}", stamp(now)));
            Event::Done
        } else {
            self.trace.line('#', &format!("abort at {}", stamp(now)));
            Event::Abort
        }
    }

    /// Accept the current command with the default reply and move to the
    /// next state. Does nothing if the command was already answered.
    pub async fn accept(&mut self) {
        if self.replied {
            return;
        }
        let Some(cur) = self.cur_cmd else { return };
        let was = self.state;
        self.state = self.next_state;
        match cur {
            Verb::Helo => {
                self.say(Reply::new(
                    250,
                    format!("{} Hello {}", self.config.local_name, self.client_addr),
                ))
                .await;
            }
            Verb::Ehlo => {
                let reply = ehlo_reply(
                    &self.config.local_name,
                    self.client_addr,
                    // MUST NOT advertise STARTTLS once TLS is on.
                    self.tls_config.is_some() && !self.tls_on,
                );
                self.say(reply).await;
            }
            Verb::MailFrom | Verb::RcptTo => {
                self.say(Reply::new(250, "Okay, I'll believe you for now"))
                    .await;
            }
            Verb::Data => {
                // DATA is current both for the initial command and for the
                // finished body; the old state tells them apart.
                if was == State::Rcpt {
                    self.say(Reply::new(354, "Send away")).await;
                } else {
                    self.say(Reply::new(250, "I've put it in a can")).await;
                }
            }
            _ => {}
        }
        self.replied = true;
    }

    /// Accept MAIL FROM, RCPT TO, DATA or the message body with caller
    /// supplied text, which may hold embedded newlines for a multi-line
    /// reply. HELO and EHLO have structural replies, so for them this is
    /// plain [`Session::accept`].
    pub async fn accept_msg(&mut self, text: impl Into<String>) {
        if self.replied || matches!(self.cur_cmd, None | Some(Verb::Helo | Verb::Ehlo)) {
            return self.accept().await;
        }
        let was = self.state;
        self.state = self.next_state;
        match self.cur_cmd {
            Some(Verb::MailFrom | Verb::RcptTo) => self.say(Reply::new(250, text)).await,
            Some(Verb::Data) => {
                let code = if was == State::Rcpt { 354 } else { 250 };
                self.say(Reply::new(code, text)).await;
            }
            _ => {}
        }
        self.replied = true;
    }

    /// Accept the message body, reporting the identifier it was filed
    /// under. Does nothing unless a body reply is owed.
    pub async fn accept_data(&mut self, id: impl std::fmt::Display) {
        if self.replied || self.cur_cmd != Some(Verb::Data) || self.state != State::PostData {
            return;
        }
        self.state = self.next_state;
        self.say(Reply::new(250, format!("I've put it in a can called {id}")))
            .await;
        self.replied = true;
    }

    /// Reject the current command with the appropriate 5xx reply. The
    /// session state does not move.
    pub async fn reject(&mut self) {
        match self.cur_cmd {
            Some(Verb::Helo | Verb::Ehlo) => self.say(Reply::new(550, "Not accepted")).await,
            Some(Verb::MailFrom | Verb::RcptTo) => self.say(Reply::new(550, "Bad address")).await,
            Some(Verb::Data) => self.say(Reply::new(554, "Not accepted")).await,
            _ => {}
        }
        self.replied = true;
    }

    /// Reject the current command with caller supplied text, which may hold
    /// embedded newlines for a multi-line reply.
    pub async fn reject_msg(&mut self, text: impl Into<String>) {
        match self.cur_cmd {
            Some(Verb::Helo | Verb::Ehlo | Verb::MailFrom | Verb::RcptTo) => {
                self.say(Reply::new(550, text)).await;
            }
            Some(Verb::Data) => self.say(Reply::new(554, text)).await,
            _ => {}
        }
        self.replied = true;
    }

    /// Reject the message body, reporting the identifier it was refused
    /// under. Does nothing unless a body reply is owed.
    pub async fn reject_data(&mut self, id: impl std::fmt::Display) {
        if self.replied || self.cur_cmd != Some(Verb::Data) || self.state != State::PostData {
            return;
        }
        self.say(Reply::new(554, format!("Not put in a can called {id}")))
            .await;
        self.replied = true;
    }

    /// Tempfail the current command with the appropriate 4xx reply.
    /// Properly implemented clients will retry later.
    pub async fn tempfail(&mut self) {
        match self.cur_cmd {
            Some(Verb::Helo | Verb::Ehlo) => self.say(Reply::new(421, "Not available now")).await,
            Some(Verb::MailFrom | Verb::RcptTo | Verb::Data) => {
                self.say(Reply::new(450, "Not available")).await;
            }
            _ => {}
        }
        self.replied = true;
    }

    /// Tempfail the current command with caller supplied text, which may
    /// hold embedded newlines for a multi-line reply.
    pub async fn tempfail_msg(&mut self, text: impl Into<String>) {
        match self.cur_cmd {
            Some(Verb::Helo | Verb::Ehlo) => self.say(Reply::new(421, text)).await,
            Some(Verb::MailFrom | Verb::RcptTo | Verb::Data) => {
                self.say(Reply::new(450, text)).await;
            }
            _ => {}
        }
        self.replied = true;
    }

    fn banner(&self, now: time::OffsetDateTime) -> String {
        let mut banner = format!("{} {}", self.config.local_name, self.config.sft_name);
        if self.config.say_time {
            if let Ok(when) = now.format(&time::format_description::well_known::Rfc2822) {
                banner.push(' ');
                banner.push_str(&when);
            }
        }
        if !self.config.announce.is_empty() {
            banner.push('\n');
            banner.push_str(&self.config.announce);
        }
        banner
    }

    /// Handle the commands that are legal in every state. `Some` is an
    /// event to surface right away (a failed TLS handshake).
    async fn run_unsequenced(&mut self, verb: Verb) -> Option<Event> {
        match verb {
            Verb::Noop => self.say(Reply::new(250, "Okay")).await,
            Verb::Rset => {
                // RSET before EHLO is valid and cannot skip EHLO. It is
                // never surfaced either; a sudden MAIL FROM implies it.
                if self.state != State::Initial {
                    self.state = State::Helo;
                }
                self.say(Reply::new(250, "Okay")).await;
            }
            Verb::Quit => {
                self.state = State::Quit;
                self.say(Reply::new(221, "Goodbye")).await;
            }
            Verb::Help => self.say(Reply::new(214, "No help here")).await,
            Verb::StartTls => return self.upgrade_tls().await,
            _ => {
                // VRFY, EXPN, AUTH and whatever else: refused.
                self.bad_cmds += 1;
                self.say(Reply::new(502, "Not supported")).await;
            }
        }
        None
    }

    async fn upgrade_tls(&mut self) -> Option<Event> {
        let Some(tls_config) = self
            .tls_config
            .clone()
            .filter(|_| !self.tls_on)
        else {
            self.bad_cmds += 1;
            self.say(Reply::new(502, "Not supported")).await;
            return None;
        };

        self.say(Reply::new(220, "Ready to start TLS")).await;
        if self.state == State::Abort {
            return None;
        }

        // The handshake chatters on the stream outside our framing, under
        // its own deadline. The plaintext buffers die with the old chain;
        // until the secured stream lands, the tunnel is a dead stand-in.
        let dead = std::io::Cursor::new(Vec::new());
        let plain = std::mem::replace(&mut self.tunnel, Box::new(dead));
        let acceptor = tokio_rustls::TlsAcceptor::from(tls_config);
        match tokio::time::timeout(self.config.limits.tls_setup, acceptor.accept(plain)).await {
            Ok(Ok(secured)) => {
                let cipher = secured
                    .get_ref()
                    .1
                    .negotiated_cipher_suite()
                    .map(|suite| suite.suite());
                match cipher {
                    Some(cipher) => self
                        .trace
                        .line('!', &format!("TLS negotiated with cipher {cipher:?}")),
                    None => self.trace.line('!', "TLS negotiated"),
                }
                self.tunnel = Box::new(secured);
                self.reader.reset();
                self.tls_on = true;
                self.tls_cipher = cipher;
                // Back to right after the greeting banner, per RFC 3207;
                // the client must EHLO again.
                self.state = State::Initial;
                None
            }
            Ok(Err(e)) => {
                self.trace.line('!', &format!("TLS setup failed: {e}"));
                self.state = State::Abort;
                Some(Event::TlsError)
            }
            Err(_elapsed) => {
                self.trace.line('!', "TLS setup failed: handshake timed out");
                self.state = State::Abort;
                Some(Event::TlsError)
            }
        }
    }

    /// Write one reply; a failed write kills the session.
    async fn say(&mut self, reply: Reply) {
        if let Err(e) = self
            .writer
            .send(&mut self.tunnel, &mut self.trace, &reply)
            .await
        {
            self.trace.line('!', &format!("reply abort: {e}"));
            self.state = State::Abort;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ehlo_reply, mime_param};
    use crate::command::parse_command;

    fn addr() -> std::net::SocketAddr {
        "192.0.2.7:2525".parse().unwrap()
    }

    #[test]
    fn ehlo_block_with_starttls() {
        pretty_assertions::assert_eq!(
            ehlo_reply("mail.example.com", addr(), true).fold(),
            [
                "250-mail.example.com Hello 192.0.2.7:2525\r\n",
                "250-8BITMIME\r\n",
                "250-PIPELINING\r\n",
                "250-STARTTLS\r\n",
                "250 HELP\r\n",
            ]
            .concat()
        );
    }

    #[test]
    fn ehlo_block_without_starttls() {
        // Unconfigured TLS, or TLS already on: the line must be absent.
        let folded = ehlo_reply("mail.example.com", addr(), false).fold();
        assert!(!folded.contains("STARTTLS"));
        assert!(folded.contains("250-8BITMIME\r\n"));
        assert!(folded.contains("250-PIPELINING\r\n"));
        assert!(folded.ends_with("250 HELP\r\n"));
    }

    #[test]
    fn mime_params_pass_on_mail_from_only() {
        assert!(mime_param(&parse_command("MAIL FROM:<a@b> BODY=8BITMIME")));
        assert!(mime_param(&parse_command("MAIL FROM:<a@b> BODY=7BIT")));
        assert!(!mime_param(&parse_command("MAIL FROM:<a@b> BODY=BINARYMIME")));
        assert!(!mime_param(&parse_command("RCPT TO:<a@b> BODY=8BITMIME")));
    }
}
