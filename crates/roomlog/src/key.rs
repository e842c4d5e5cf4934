use pineapple_channels::ChannelType;

/// Characters removed from room IDs before they become file names.
const STRIPPED: &[char] = &['#', '<', '>', ':', '@', '!', '/', '\\'];

/// Build the log key for a room, e.g. `!abc:example.org` -> `matrix_abcexample.org`.
///
/// The same key names the log file and the responder channel.
pub fn room_key(channel_type: ChannelType, chat_id: &str) -> String {
    let sanitized: String = chat_id.chars().filter(|c| !STRIPPED.contains(c)).collect();
    format!("{channel_type}_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_room_id_sigils() {
        assert_eq!(
            room_key(ChannelType::Matrix, "!AbC123:example.org"),
            "matrix_AbC123example.org"
        );
        assert_eq!(
            room_key(ChannelType::Matrix, "#alias:example.org"),
            "matrix_aliasexample.org"
        );
        assert_eq!(
            room_key(ChannelType::Matrix, "<@user:host>"),
            "matrix_userhost"
        );
    }

    #[test]
    fn strips_path_separators() {
        assert_eq!(
            room_key(ChannelType::Matrix, "!../../etc:host"),
            "matrix_....etchost"
        );
    }
}
