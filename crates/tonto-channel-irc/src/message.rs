//! IRC line parsing.

/// One parsed protocol line: `[@tags] [:prefix] COMMAND params... [:trailing]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a raw line. Returns `None` for blank or prefix-only lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags are not used.
        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1.trim_start();
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, tail) = stripped.split_once(' ')?;
                rest = tail.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            let param = tail.trim_start_matches(' ');
            if param.is_empty() {
                break;
            }
            if let Some(trailing) = param.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match param.split_once(' ') {
                Some((middle, more)) => {
                    params.push(middle.to_string());
                    tail = more;
                }
                None => {
                    params.push(param.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Format a channel message.
pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {target} :{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg = IrcMessage::parse(":alice!a@host.example PRIVMSG #chan :hello http://x.org\r\n")
            .unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host.example"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#chan", "hello http://x.org"]);
        assert_eq!(msg.nick(), Some("alice"));
    }

    #[test]
    fn test_parse_ping_without_prefix() {
        let msg = IrcMessage::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("irc.example.net"));
        assert_eq!(msg.nick(), None);
    }

    #[test]
    fn test_parse_numeric_with_middle_params() {
        let msg = IrcMessage::parse(":server 433 * tonto_bot :Nickname is already in use").unwrap();
        assert_eq!(msg.command, "433");
        assert_eq!(msg.params, vec!["*", "tonto_bot", "Nickname is already in use"]);
        assert_eq!(msg.nick(), Some("server"));
    }

    #[test]
    fn test_parse_tags_and_empty_trailing() {
        let msg = IrcMessage::parse("@time=2024-01-01T00:00:00Z :bob!b@h PRIVMSG #chan :").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#chan", ""]);
    }

    #[test]
    fn test_parse_join_without_colon() {
        let msg = IrcMessage::parse(":tonto_bot!t@h JOIN #chan").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.param(0), Some("#chan"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(IrcMessage::parse(""), None);
        assert_eq!(IrcMessage::parse("\r\n"), None);
        assert_eq!(IrcMessage::parse(":onlyprefix"), None);
    }

    #[test]
    fn test_privmsg() {
        assert_eq!(privmsg("#chan", "pong"), "PRIVMSG #chan :pong");
    }
}
