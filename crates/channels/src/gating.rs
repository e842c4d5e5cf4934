use serde::{Deserialize, Serialize};

/// Check if a room is allowed to interact with the bot.
///
/// An empty allowlist means every room is allowed (open policy).
/// Entries are matched case-insensitively against the room ID.
/// Supports exact match and glob-style `*` wildcards.
pub fn is_allowed(room_id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let room_lower = room_id.to_lowercase();
    allowlist.iter().any(|pattern| {
        let pat = pattern.to_lowercase();
        if pat.contains('*') {
            glob_match(&pat, &room_lower)
        } else {
            pat == room_lower
        }
    })
}

/// Glob matching supporting `*` as a wildcard for any sequence of chars.
///
/// Backtracks to the most recent `*` on a mismatch, so a segment that also
/// occurs earlier in the text still matches at the end.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pat = pattern.as_bytes();
    let txt = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && pat[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if p < pat.len() && pat[p] == txt[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pat[p..].iter().all(|&c| c == b'*')
}

/// Which rooms the bot answers in. Every room is logged regardless.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyPolicy {
    /// Only end-to-end encrypted rooms.
    #[default]
    Encrypted,
    /// Every room.
    Always,
    /// Never reply; log and learn only.
    Never,
}

impl ReplyPolicy {
    pub fn allows(self, encrypted: bool) -> bool {
        match self {
            Self::Encrypted => encrypted,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn empty_allowlist_allows_everyone() {
        assert!(is_allowed("!anything:example.org", &[]));
    }

    #[test]
    fn exact_match() {
        let list = vec!["!abc:example.org".into(), "!def:example.org".into()];
        assert!(is_allowed("!abc:example.org", &list));
        assert!(is_allowed("!ABC:Example.org", &list));
        assert!(!is_allowed("!xyz:example.org", &list));
    }

    #[test]
    fn glob_suffix() {
        let list = vec!["*:example.org".into()];
        assert!(is_allowed("!abc:example.org", &list));
        assert!(!is_allowed("!abc:other.org", &list));
    }

    #[test]
    fn glob_prefix_and_middle() {
        let list = vec!["!team*:*.org".into()];
        assert!(is_allowed("!team42:example.org", &list));
        assert!(!is_allowed("!other:example.org", &list));
        assert!(!is_allowed("!team42:example.com", &list));
    }

    #[rstest]
    #[case("*org", "!org:foo.org", true)]
    #[case("!org*org", "!org:foo.org", true)]
    #[case("*foo*", "!org:foo.org", true)]
    #[case("*:foo.org", "!foo.org:bar.org", false)]
    #[case("!a*b*c", "!abcbc", true)]
    #[case("!a*b*c", "!abcb", false)]
    #[case("**", "", true)]
    fn glob_backtracks(#[case] pattern: &str, #[case] room: &str, #[case] allowed: bool) {
        assert_eq!(is_allowed(room, &[pattern.to_string()]), allowed);
    }

    #[rstest]
    #[case(ReplyPolicy::Encrypted, true, true)]
    #[case(ReplyPolicy::Encrypted, false, false)]
    #[case(ReplyPolicy::Always, false, true)]
    #[case(ReplyPolicy::Never, true, false)]
    fn reply_policy(#[case] policy: ReplyPolicy, #[case] encrypted: bool, #[case] allowed: bool) {
        assert_eq!(policy.allows(encrypted), allowed);
    }

    #[test]
    fn reply_policy_deserializes_lowercase() {
        let policy: ReplyPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(policy, ReplyPolicy::Always);
        assert_eq!(ReplyPolicy::default(), ReplyPolicy::Encrypted);
    }
}
