//! SMTP extension types.
//!
//! EHLO replies carry no structured capability format, so the client scans
//! the raw reply text for the few keywords it acts on.

/// Capabilities discovered from an EHLO/LHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Authentication mechanisms advertised through `AUTH`.
    pub auth: Vec<AuthMechanism>,
    /// Maximum message size from `SIZE <n>`.
    pub size: Option<u64>,
    /// Whether `STARTTLS` was advertised.
    pub starttls: bool,
}

impl Capabilities {
    /// Scans the raw EHLO reply (lines joined by `\n`).
    ///
    /// `auth` lists the known mechanisms in [`AuthMechanism::PREFERENCE`]
    /// order, whatever order the server used.
    #[must_use]
    pub fn sniff(raw: &str) -> Self {
        let mut caps = Self::default();
        let mut advertised = Vec::new();

        for line in raw.lines() {
            let upper = line.trim_end().to_ascii_uppercase();
            let text = reply_text(&upper);

            if let Some(rest) = text.strip_prefix("AUTH") {
                if rest.starts_with(|c: char| c.is_whitespace() || c == '=') {
                    advertised.extend(
                        rest.split(|c: char| c.is_whitespace() || c == '=')
                            .filter_map(AuthMechanism::parse),
                    );
                }
            }

            if caps.size.is_none() {
                caps.size = find_size(&upper);
            }

            if upper.ends_with("STARTTLS") {
                let prefix = &upper[..upper.len() - "STARTTLS".len()];
                if prefix.ends_with([' ', '-']) {
                    caps.starttls = true;
                }
            }
        }

        caps.auth = AuthMechanism::PREFERENCE
            .into_iter()
            .filter(|mech| advertised.contains(mech))
            .collect();
        caps
    }
}

/// Strips the `250-` / `250 ` prefix when present.
fn reply_text(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() >= 4 && bytes[..3].iter().all(u8::is_ascii_digit) && matches!(bytes[3], b'-' | b' ')
    {
        &line[4..]
    } else {
        line
    }
}

/// Finds `SIZE <digits>` anywhere in the line.
fn find_size(line: &str) -> Option<u64> {
    let mut rest = line;
    while let Some(pos) = rest.find("SIZE ") {
        let after = &rest[pos + "SIZE ".len()..];
        let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
        rest = after;
    }
    None
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
}

impl AuthMechanism {
    /// Mechanisms in the order they are preferred when the server offers
    /// several.
    pub const PREFERENCE: [Self; 3] = [Self::Plain, Self::Login, Self::XOAuth2];

    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    mod sniff_tests {
        use super::*;

        #[test]
        fn full_ehlo_reply() {
            let raw = "250-smtp.example.com greets you\n\
                       250-PIPELINING\n\
                       250-SIZE 52428800\n\
                       250-STARTTLS\n\
                       250 AUTH LOGIN PLAIN XOAUTH2";
            let caps = Capabilities::sniff(raw);
            assert_eq!(
                caps.auth,
                vec![AuthMechanism::Plain, AuthMechanism::Login, AuthMechanism::XOAuth2]
            );
            assert_eq!(caps.size, Some(52_428_800));
            assert!(caps.starttls);
        }

        #[test]
        fn case_insensitive() {
            let caps = Capabilities::sniff("250-auth plain\n250 starttls");
            assert_eq!(caps.auth, vec![AuthMechanism::Plain]);
            assert!(caps.starttls);
        }

        #[test]
        fn legacy_equals_form() {
            let caps = Capabilities::sniff("250-AUTH=LOGIN\n250 OK");
            assert_eq!(caps.auth, vec![AuthMechanism::Login]);
        }

        #[test]
        fn duplicate_auth_lines_deduplicated() {
            let caps = Capabilities::sniff("250-AUTH PLAIN\n250 AUTH=PLAIN LOGIN");
            assert_eq!(caps.auth, vec![AuthMechanism::Plain, AuthMechanism::Login]);
        }

        #[test]
        fn auth_listed_in_preference_order() {
            let caps = Capabilities::sniff("250 AUTH XOAUTH2 LOGIN");
            assert_eq!(caps.auth, vec![AuthMechanism::Login, AuthMechanism::XOAuth2]);

            let caps = Capabilities::sniff("250-AUTH LOGIN\n250 AUTH=PLAIN");
            assert_eq!(caps.auth, vec![AuthMechanism::Plain, AuthMechanism::Login]);
        }

        #[test]
        fn starttls_must_be_a_keyword() {
            let caps = Capabilities::sniff("250 NOSTARTTLS");
            assert!(!caps.starttls);
            let caps = Capabilities::sniff("250 STARTTLS ");
            assert!(caps.starttls);
        }

        #[test]
        fn size_without_value() {
            let caps = Capabilities::sniff("250-SIZE\n250 OK");
            assert_eq!(caps.size, None);
        }

        #[test]
        fn unknown_mechanisms_ignored() {
            let caps = Capabilities::sniff("250 AUTH CRAM-MD5 GSSAPI");
            assert!(caps.auth.is_empty());
        }

        #[test]
        fn empty_reply() {
            assert_eq!(Capabilities::sniff(""), Capabilities::default());
        }
    }

    mod auth_mechanism_tests {
        use super::*;

        #[test]
        fn parse() {
            assert_eq!(AuthMechanism::parse("PLAIN"), Some(AuthMechanism::Plain));
            assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
            assert_eq!(AuthMechanism::parse(" login "), Some(AuthMechanism::Login));
            assert_eq!(AuthMechanism::parse("XOAUTH2"), Some(AuthMechanism::XOAuth2));
            assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
        }

        #[test]
        fn as_str() {
            assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
            assert_eq!(AuthMechanism::Login.as_str(), "LOGIN");
            assert_eq!(AuthMechanism::XOAuth2.to_string(), "XOAUTH2");
        }
    }
}
