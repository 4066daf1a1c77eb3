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

/// SMTP reply sent by the server to the client, as defined in RFC 5321 §4.2.
///
/// The text may contain embedded `\n`; rendering then produces the multi-line
/// form, `NNN-text` for every line but the last and `NNN text` for the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    /// Build a reply from a three-digit code and its text.
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// The three-digit reply code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// The reply text, before any multi-line rendering.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render the reply as wire lines, without the CR-LF terminators.
    ///
    /// Surrounding whitespace and blank lines are trimmed off the text first;
    /// interior empty lines survive as bare continuation lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let text = self.text.trim_matches(|c| c == ' ' || c == '\t' || c == '\n');
        let split = text.split('\n').collect::<Vec<_>>();
        let last = split.len() - 1;

        split
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let sep = if i == last { ' ' } else { '-' };
                format!("{}{}{}", self.code, sep, line)
            })
            .collect()
    }

    /// Render the reply as the full CR-LF terminated wire form.
    #[must_use]
    pub fn fold(&self) -> String {
        self.lines().into_iter().map(|l| l + "\r\n").collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Reply;

    mod fold {
        use super::Reply;

        #[test]
        fn single_line() {
            pretty_assertions::assert_eq!(
                Reply::new(250, "Okay, I'll believe you for now").fold(),
                "250 Okay, I'll believe you for now\r\n"
            );
        }

        #[test]
        fn embedded_newlines() {
            pretty_assertions::assert_eq!(
                Reply::new(220, "mail.example.com tinsmtp\nNo UCE here please").fold(),
                ["220-mail.example.com tinsmtp\r\n", "220 No UCE here please\r\n"].concat()
            );
        }

        #[test]
        fn trailing_whitespace_trimmed() {
            pretty_assertions::assert_eq!(Reply::new(250, "Okay \t\n\n").fold(), "250 Okay\r\n");
        }

        #[test]
        fn interior_blank_line_kept() {
            pretty_assertions::assert_eq!(
                Reply::new(550, "no\n\nreally no").lines(),
                vec!["550-no", "550-", "550 really no"]
            );
        }

        #[test]
        fn ehlo_block() {
            let output = Reply::new(
                250,
                "mail.example.com Hello 192.0.2.7:2525\n8BITMIME\nPIPELINING\nSTARTTLS\nHELP",
            )
            .fold();
            pretty_assertions::assert_eq!(
                output,
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
    }

    #[test]
    fn accessors() {
        let reply = Reply::new(221, "Goodbye");
        assert_eq!(reply.code(), 221);
        assert_eq!(reply.text(), "Goodbye");
    }
}
