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

/// Time and size limits applied to one SMTP session.
///
/// The defaults are not necessarily RFC compliant, but they are enough for
/// real mail clients: two minutes for command input and replies, ten minutes
/// to receive a message, and five mebibytes of message size.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Deadline to receive one client command line.
    #[serde(default = "Limits::default_cmd_input", with = "humantime_serde")]
    pub cmd_input: std::time::Duration,
    /// Deadline to receive the whole message body.
    #[serde(default = "Limits::default_msg_input", with = "humantime_serde")]
    pub msg_input: std::time::Duration,
    /// Deadline to write one reply to the client.
    #[serde(default = "Limits::default_reply_out", with = "humantime_serde")]
    pub reply_out: std::time::Duration,
    /// Deadline to finish the STARTTLS handshake.
    #[serde(default = "Limits::default_tls_setup", with = "humantime_serde")]
    pub tls_setup: std::time::Duration,
    /// Byte cap on the message body.
    #[serde(default = "Limits::default_msg_size")]
    pub msg_size: usize,
    /// How many bad commands are tolerated before the session is aborted.
    #[serde(default = "Limits::default_bad_cmds")]
    pub bad_cmds: usize,
    /// Refuse MAIL FROM / RCPT TO carrying ESMTP parameters.
    ///
    /// `BODY=7BIT` and `BODY=8BITMIME` on MAIL FROM are always accepted,
    /// since the engine advertises 8BITMIME.
    #[serde(default = "Limits::default_no_params")]
    pub no_params: bool,
}

impl Limits {
    /// Default deadline for one command line: 2 minutes.
    #[must_use]
    pub const fn default_cmd_input() -> std::time::Duration {
        std::time::Duration::from_secs(120)
    }

    /// Default deadline for the whole message body: 10 minutes.
    #[must_use]
    pub const fn default_msg_input() -> std::time::Duration {
        std::time::Duration::from_secs(600)
    }

    /// Default deadline for one reply write: 2 minutes.
    #[must_use]
    pub const fn default_reply_out() -> std::time::Duration {
        std::time::Duration::from_secs(120)
    }

    /// Default deadline for the STARTTLS handshake: 4 minutes.
    #[must_use]
    pub const fn default_tls_setup() -> std::time::Duration {
        std::time::Duration::from_secs(240)
    }

    /// Default message size cap: 5 MiB.
    #[must_use]
    pub const fn default_msg_size() -> usize {
        5 * 1024 * 1024
    }

    /// Default bad command tolerance: 5.
    #[must_use]
    pub const fn default_bad_cmds() -> usize {
        5
    }

    /// Parameters on MAIL FROM / RCPT TO are refused by default.
    #[must_use]
    pub const fn default_no_params() -> bool {
        true
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cmd_input: Self::default_cmd_input(),
            msg_input: Self::default_msg_input(),
            reply_out: Self::default_reply_out(),
            tls_setup: Self::default_tls_setup(),
            msg_size: Self::default_msg_size(),
            bad_cmds: Self::default_bad_cmds(),
            no_params: Self::default_no_params(),
        }
    }
}

/// Configuration of one SMTP session.
///
/// All fields are optional and defaulted when deserialized from a
/// configuration file. The TLS server configuration is deliberately not part
/// of this structure; it is handed to the session next to it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// see [`Limits`]
    #[serde(default)]
    pub limits: Limits,
    /// Pace every reply byte by this much. Zero disables pacing.
    #[serde(default, with = "humantime_serde")]
    pub delay: std::time::Duration,
    /// Report the date and time in the greeting banner.
    #[serde(default)]
    pub say_time: bool,
    /// The local hostname used in the banner and replies.
    #[serde(default = "Config::default_local_name")]
    pub local_name: String,
    /// The software name used in the banner.
    #[serde(default = "Config::default_sft_name")]
    pub sft_name: String,
    /// Extra text announced in the greeting banner, one line per `\n`.
    #[serde(default)]
    pub announce: String,
}

impl Config {
    /// The hostname used when none is configured.
    #[must_use]
    pub fn default_local_name() -> String {
        "localhost".to_owned()
    }

    /// The software tag used when none is configured.
    #[must_use]
    pub fn default_sft_name() -> String {
        "tinsmtp".to_owned()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            delay: std::time::Duration::ZERO,
            say_time: false,
            local_name: Self::default_local_name(),
            sft_name: Self::default_sft_name(),
            announce: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Limits};

    #[test]
    fn defaults() {
        let limits = Limits::default();
        pretty_assertions::assert_eq!(limits.cmd_input.as_secs(), 120);
        pretty_assertions::assert_eq!(limits.msg_input.as_secs(), 600);
        pretty_assertions::assert_eq!(limits.reply_out.as_secs(), 120);
        pretty_assertions::assert_eq!(limits.tls_setup.as_secs(), 240);
        pretty_assertions::assert_eq!(limits.msg_size, 5 * 1024 * 1024);
        pretty_assertions::assert_eq!(limits.bad_cmds, 5);
        assert!(limits.no_params);

        let config = Config::default();
        pretty_assertions::assert_eq!(config.local_name, "localhost");
        pretty_assertions::assert_eq!(config.sft_name, "tinsmtp");
        assert!(config.announce.is_empty());
        assert!(!config.say_time);
        assert!(config.delay.is_zero());
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = toml::from_str::<Config>("").unwrap();
        pretty_assertions::assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_document_keeps_the_rest() {
        let config = toml::from_str::<Config>(
            r#"
local_name = "mail.example.com"
delay = "200ms"

[limits]
msg_size = 1048576
"#,
        )
        .unwrap();

        pretty_assertions::assert_eq!(config.local_name, "mail.example.com");
        pretty_assertions::assert_eq!(config.delay.as_millis(), 200);
        pretty_assertions::assert_eq!(config.limits.msg_size, 1024 * 1024);
        pretty_assertions::assert_eq!(config.limits.bad_cmds, 5);
        pretty_assertions::assert_eq!(config.sft_name, "tinsmtp");
    }

    #[test]
    fn unknown_fields_are_refused() {
        assert!(toml::from_str::<Config>("banner_color = \"red\"").is_err());
    }
}
