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

/// SMTP command verbs recognized by the engine.
///
/// Not all of them do anything; VRFY, EXPN and AUTH are refused at the
/// protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display)]
pub enum Verb {
    /// Used to identify the SMTP client to the SMTP server. (historical)
    #[strum(serialize = "HELO")]
    Helo,
    /// Used to identify the SMTP client to the SMTP server and request SMTP
    /// extensions.
    #[strum(serialize = "EHLO")]
    Ehlo,
    /// Initiates a mail transaction and names the reverse-path.
    #[strum(serialize = "MAIL FROM")]
    MailFrom,
    /// Names one recipient of the mail data; repeated for multiple
    /// recipients.
    #[strum(serialize = "RCPT TO")]
    RcptTo,
    /// Asks to send the mail data itself.
    #[strum(serialize = "DATA")]
    Data,
    /// Asks the server to acknowledge and close the channel.
    #[strum(serialize = "QUIT")]
    Quit,
    /// Aborts the current mail transaction.
    #[strum(serialize = "RSET")]
    Rset,
    /// Does nothing.
    #[strum(serialize = "NOOP")]
    Noop,
    /// Asks to verify an address. Refused.
    #[strum(serialize = "VRFY")]
    Vrfy,
    /// Asks to expand a mailing list. Refused.
    #[strum(serialize = "EXPN")]
    Expn,
    /// Asks for helpful information.
    #[strum(serialize = "HELP")]
    Help,
    /// In-band upgrade to TLS, RFC 3207.
    #[strum(serialize = "STARTTLS")]
    StartTls,
    /// SASL authentication, RFC 4954. Refused.
    #[strum(serialize = "AUTH")]
    Auth,
    /// Anything that did not match the command table.
    #[strum(serialize = "<bad SMTP command>")]
    Unknown,
}

/// What a verb expects after its literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    /// Nothing may follow the verb.
    None,
    /// An argument may follow the verb.
    Optional,
    /// At least one non-whitespace character must follow the verb.
    Required,
    /// `:<addr>[ params...]` must follow the verb.
    ColonAddress,
}

/// The command table, scanned in order; the first prefix match wins.
///
/// Requirements are slightly relaxed from the RFCs: argumentless HELO and
/// EHLO are accepted.
const COMMANDS: &[(Verb, ArgKind)] = &[
    (Verb::Helo, ArgKind::Optional),
    (Verb::Ehlo, ArgKind::Optional),
    (Verb::MailFrom, ArgKind::ColonAddress),
    (Verb::RcptTo, ArgKind::ColonAddress),
    (Verb::Data, ArgKind::None),
    (Verb::Quit, ArgKind::None),
    (Verb::Rset, ArgKind::None),
    (Verb::Noop, ArgKind::None),
    (Verb::Vrfy, ArgKind::Required),
    (Verb::Expn, ArgKind::Required),
    (Verb::Help, ArgKind::Optional),
    (Verb::StartTls, ArgKind::None),
    (Verb::Auth, ArgKind::Required),
];

/// Error produced while parsing one command line.
///
/// The display strings end up on the wire, embedded in 501 and 553 replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line holds bytes outside of US-ASCII.
    #[error("command contains non 7-bit ASCII")]
    NonAscii,
    /// No entry of the command table matched.
    #[error("unrecognized command")]
    Unrecognized,
    /// Something followed a verb that takes no argument.
    #[error("SMTP command does not take an argument")]
    NoArgumentAllowed,
    /// Nothing (or only whitespace) followed a verb that needs an argument.
    #[error("SMTP command requires an argument")]
    ArgumentRequired,
    /// The line is too short to hold the `:<>` address form.
    #[error("SMTP command requires an address")]
    AddressRequired,
    /// The `:<addr>` address form is malformed.
    #[error("improper argument formatting")]
    BadAddressSyntax,
}

/// A parsed SMTP command line.
///
/// `error` is set if there was one, and `verb` may still name a command when
/// it is; only an unrecognizable line yields [`Verb::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// The matched verb, [`Verb::Unknown`] if nothing matched.
    pub verb: Verb,
    /// The argument after grammar normalization: surrounding whitespace
    /// trimmed, angle brackets stripped for addresses. Empty for the null
    /// sender `<>`.
    pub arg: String,
    /// The ESMTP extension string after `>`, only ever present on MAIL FROM
    /// and RCPT TO.
    pub params: String,
    /// The parse error, if any.
    pub error: Option<ParseError>,
}

impl ParsedLine {
    fn ok(verb: Verb, arg: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            verb,
            arg: arg.into(),
            params: params.into(),
            error: None,
        }
    }

    fn bad(error: ParseError) -> Self {
        Self {
            verb: Verb::Unknown,
            arg: String::new(),
            params: String::new(),
            error: Some(error),
        }
    }

    fn garbled(verb: Verb, error: ParseError) -> Self {
        Self {
            verb,
            arg: String::new(),
            params: String::new(),
            error: Some(error),
        }
    }
}

/// Parse one SMTP command line, the ending CR-LF already removed.
///
/// The match is case-insensitive and must end at a word boundary (end of
/// line, space, or `:`). `MAIL FROM` and `RCPT TO` are matched as two-word
/// verbs.
#[must_use]
pub fn parse_command(line: &str) -> ParsedLine {
    // The line gets upper-cased for the table scan, which would explode on
    // UTF-8 or anything that smells like it. SMTP commands are US-ASCII.
    if !line.is_ascii() {
        return ParsedLine::bad(ParseError::NonAscii);
    }
    let upper = line.to_ascii_uppercase();

    let Some(&(verb, kind)) = COMMANDS
        .iter()
        .find(|(verb, _)| upper.starts_with(verb.as_ref()))
    else {
        return ParsedLine::bad(ParseError::Unrecognized);
    };

    // A true match ends at a word boundary. Past this point we work with the
    // original-case line, not the upper-cased scan copy.
    let bytes = line.as_bytes();
    let llen = line.len();
    let vlen = verb.as_ref().len();
    if !(llen == vlen || bytes[vlen] == b' ' || bytes[vlen] == b':') {
        return ParsedLine::bad(ParseError::Unrecognized);
    }

    match kind {
        ArgKind::None => {
            if llen != vlen {
                return ParsedLine::garbled(verb, ParseError::NoArgumentAllowed);
            }
            ParsedLine::ok(verb, "", "")
        }
        ArgKind::Required => {
            if llen <= vlen + 1 {
                return ParsedLine::garbled(verb, ParseError::ArgumentRequired);
            }
            // Even if there are nominal characters they could be all
            // whitespace.
            let arg = line[vlen + 1..].trim();
            if arg.is_empty() {
                return ParsedLine::garbled(verb, ParseError::ArgumentRequired);
            }
            ParsedLine::ok(verb, arg, "")
        }
        ArgKind::Optional => {
            if llen > vlen + 1 {
                ParsedLine::ok(verb, line[vlen + 1..].trim(), "")
            } else {
                ParsedLine::ok(verb, "", "")
            }
        }
        ArgKind::ColonAddress => parse_colon_address(verb, line, vlen),
    }
}

/// Parse the `:<addr>[ params...]` form after a MAIL FROM or RCPT TO verb.
///
/// One space between the `:` and the `<` is tolerated; the RFC forbids it but
/// a few too many clients generate it. The closing `>` is the last character
/// of the line when the line ends with one, otherwise the first `>` followed
/// by a space. An address that embeds a quoted `>` is therefore mis-split
/// and rejected; full RFC 5321 address parsing does not happen here.
fn parse_colon_address(verb: Verb, line: &str, vlen: usize) -> ParsedLine {
    let bytes = line.as_bytes();
    let llen = line.len();

    // Minimum is the verb plus ':<>', three characters.
    if llen < vlen + 3 {
        return ParsedLine::garbled(verb, ParseError::AddressRequired);
    }

    let close = if bytes[llen - 1] == b'>' {
        Some(llen - 1)
    } else {
        match line.find('>') {
            Some(idx) if bytes[idx + 1] != b' ' => {
                return ParsedLine::garbled(verb, ParseError::BadAddressSyntax);
            }
            found => found,
        }
    };
    let Some(close) = close.filter(|_| bytes[vlen] == b':') else {
        return ParsedLine::garbled(verb, ParseError::BadAddressSyntax);
    };

    let mut open = vlen + 1;
    if bytes[open] == b' ' {
        open += 1;
    }
    if bytes[open] != b'<' {
        return ParsedLine::garbled(verb, ParseError::BadAddressSyntax);
    }

    // As a side effect this generously allows trailing whitespace after the
    // parameters.
    ParsedLine::ok(verb, &line[open + 1..close], line[close + 1..].trim())
}

#[cfg(test)]
mod tests {
    use super::{parse_command, ParseError, ParsedLine, Verb};

    #[test]
    fn rejects_non_ascii() {
        let parsed = parse_command("EHLO m\u{e9}nage");
        pretty_assertions::assert_eq!(parsed.verb, Verb::Unknown);
        pretty_assertions::assert_eq!(parsed.error, Some(ParseError::NonAscii));
    }

    #[test]
    fn rejects_unknown_verbs() {
        for line in ["GIBBERISH", "MAIL TO:<a@b>", "XEXPN a", ""] {
            pretty_assertions::assert_eq!(
                parse_command(line),
                ParsedLine {
                    verb: Verb::Unknown,
                    arg: String::new(),
                    params: String::new(),
                    error: Some(ParseError::Unrecognized),
                },
                "line: {line:?}"
            );
        }
    }

    #[test]
    fn requires_a_word_boundary() {
        // Prefix matches that do not end at end-of-line, space or ':' are
        // not matches at all.
        for line in ["DATAX", "QUITTER", "HELOthere"] {
            pretty_assertions::assert_eq!(
                parse_command(line).error,
                Some(ParseError::Unrecognized),
                "line: {line:?}"
            );
        }
    }

    #[test]
    fn is_case_insensitive() {
        let parsed = parse_command("mail from:<a@b>");
        pretty_assertions::assert_eq!(parsed.verb, Verb::MailFrom);
        pretty_assertions::assert_eq!(parsed.arg, "a@b");
        pretty_assertions::assert_eq!(parsed.error, None);
    }

    #[rstest::rstest]
    #[case("DATA", Verb::Data)]
    #[case("QUIT", Verb::Quit)]
    #[case("RSET", Verb::Rset)]
    #[case("NOOP", Verb::Noop)]
    #[case("STARTTLS", Verb::StartTls)]
    fn bare_verbs(#[case] line: &str, #[case] verb: Verb) {
        pretty_assertions::assert_eq!(parse_command(line), ParsedLine::ok(verb, "", ""));
    }

    #[rstest::rstest]
    #[case("DATA now")]
    #[case("QUIT now")]
    #[case("RSET it")]
    #[case("STARTTLS please")]
    fn no_argument_verbs_refuse_arguments(#[case] line: &str) {
        let parsed = parse_command(line);
        assert_ne!(parsed.verb, Verb::Unknown);
        pretty_assertions::assert_eq!(parsed.error, Some(ParseError::NoArgumentAllowed));
    }

    #[rstest::rstest]
    #[case("VRFY", Verb::Vrfy)]
    #[case("VRFY   ", Verb::Vrfy)]
    #[case("EXPN", Verb::Expn)]
    #[case("AUTH", Verb::Auth)]
    fn required_argument_verbs_refuse_blank(#[case] line: &str, #[case] verb: Verb) {
        pretty_assertions::assert_eq!(
            parse_command(line),
            ParsedLine::garbled(verb, ParseError::ArgumentRequired)
        );
    }

    #[test]
    fn optional_arguments_are_trimmed() {
        pretty_assertions::assert_eq!(parse_command("HELO"), ParsedLine::ok(Verb::Helo, "", ""));
        pretty_assertions::assert_eq!(
            parse_command("EHLO  mx.example.net  "),
            ParsedLine::ok(Verb::Ehlo, "mx.example.net", "")
        );
    }

    #[rstest::rstest]
    #[case("MAIL FROM:<a@b>", "a@b", "")]
    #[case("MAIL FROM: <a@b>", "a@b", "")] // tolerated, though the RFC says no
    #[case("MAIL FROM:<>", "", "")]
    #[case("MAIL FROM:<a@b> BODY=8BITMIME", "a@b", "BODY=8BITMIME")]
    #[case("MAIL FROM:<a@b> SIZE=100 BODY=7BIT", "a@b", "SIZE=100 BODY=7BIT")]
    #[case("MAIL FROM:<<odd>>", "<odd>", "")] // ends-with-'>' takes precedence
    fn colon_addresses(#[case] line: &str, #[case] arg: &str, #[case] params: &str) {
        pretty_assertions::assert_eq!(
            parse_command(line),
            ParsedLine::ok(Verb::MailFrom, arg, params)
        );
    }

    #[rstest::rstest]
    #[case("MAIL FROM:", ParseError::AddressRequired)]
    #[case("MAIL FROM: ", ParseError::AddressRequired)]
    #[case("MAIL FROM:a@b", ParseError::BadAddressSyntax)]
    #[case("MAIL FROM:<a@b", ParseError::BadAddressSyntax)]
    #[case("MAIL FROM:<a@b>x", ParseError::BadAddressSyntax)]
    #[case("MAIL FROM:  <a@b>", ParseError::BadAddressSyntax)] // only one space
    #[case("MAIL FROM <a@b>", ParseError::BadAddressSyntax)]
    fn malformed_colon_addresses(#[case] line: &str, #[case] error: ParseError) {
        pretty_assertions::assert_eq!(
            parse_command(line),
            ParsedLine::garbled(Verb::MailFrom, error)
        );
    }

    #[test]
    fn rcpt_to_params_survive() {
        pretty_assertions::assert_eq!(
            parse_command("RCPT TO:<c@d> NOTIFY=NEVER"),
            ParsedLine::ok(Verb::RcptTo, "c@d", "NOTIFY=NEVER")
        );
    }

    #[test]
    fn verb_displays_its_wire_text() {
        pretty_assertions::assert_eq!(Verb::MailFrom.to_string(), "MAIL FROM");
        pretty_assertions::assert_eq!(Verb::StartTls.to_string(), "STARTTLS");
    }
}
