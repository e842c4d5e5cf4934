use std::{collections::HashMap, path::Path};

use {
    rand::Rng,
    serde::Serialize,
    tracing::{debug, trace},
};

use crate::{
    choice::ChoiceMap,
    ending::is_valid_end,
    error::{Context, Error, Result},
};

/// How many extra words a reply may grow by while looking for a clean ending.
const MAX_ENDING_EXTENSION: usize = 5;

/// Weight multiplier for an opener whose recorded context word matches the
/// prompt's second-to-last word.
const CONTEXT_BIAS: usize = 4;

/// Opening word of a message, paired with the second-to-last word of the
/// message it answered.
type Opener = (String, Option<String>);

/// Counters describing how much the chain has learned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub channels: usize,
    pub messages: usize,
    pub vocabulary: usize,
    pub transitions: usize,
    pub openers: usize,
}

/// Word-level Markov chain.
#[derive(Debug)]
pub struct MarkovChain {
    /// Last word of a message (lowercased) -> how the next message opened.
    first_words: HashMap<String, ChoiceMap<Opener>>,
    /// Word (lowercased) -> following word as written.
    words: HashMap<String, ChoiceMap<String>>,
    /// Word counts of learned messages.
    lengths: ChoiceMap<usize>,
    last_message: HashMap<String, String>,
    /// Prefix marking the bot's own lines in log files.
    marker: String,
}

impl MarkovChain {
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            first_words: HashMap::new(),
            words: HashMap::new(),
            lengths: ChoiceMap::new(),
            last_message: HashMap::new(),
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Remember `message` as the latest in `channel` without learning from it.
    pub fn set_message(&mut self, channel: &str, message: &str) {
        self.last_message
            .insert(channel.to_owned(), message.to_owned());
    }

    /// Learn from `message` and remember it as the latest in `channel`.
    pub fn add_message(&mut self, channel: &str, message: &str) {
        if message.is_empty() {
            return;
        }
        let previous = self
            .last_message
            .insert(channel.to_owned(), message.to_owned());

        let Some(first_word) = message.split(' ').next() else {
            return;
        };
        self.lengths.insert(message.split(' ').count());

        if let Some(previous) = previous {
            let mut prev_words = previous.split(' ');
            if let Some(last_word) = prev_words.next_back() {
                let context = prev_words.next_back().map(str::to_lowercase);
                self.first_words
                    .entry(last_word.to_lowercase())
                    .or_default()
                    .insert((first_word.to_owned(), context));
            }
        }

        for (word, next) in message.split(' ').zip(message.split(' ').skip(1)) {
            self.words
                .entry(word.to_lowercase())
                .or_default()
                .insert(next.to_owned());
        }
    }

    /// Generate a reply to `message` using the thread-local RNG.
    pub fn get_reply(&self, message: &str) -> Option<String> {
        self.get_reply_with(message, &mut rand::rng())
    }

    /// Generate a reply to `message` drawing randomness from `rng`.
    pub fn get_reply_with<R: Rng>(&self, message: &str, rng: &mut R) -> Option<String> {
        let mut prompt = message.split(' ');
        let last_word = prompt.next_back()?.to_lowercase();
        let context = prompt.next_back().map(str::to_lowercase);

        let openers = self.first_words.get(&last_word)?;
        let (first_word, _) = match context {
            Some(ref context) => openers.choose_biased(rng, |(_, seen)| {
                if seen.as_deref() == Some(context.as_str()) {
                    CONTEXT_BIAS
                } else {
                    1
                }
            }),
            None => openers.choose(rng),
        }?;

        let mut remaining = *self.lengths.choose(rng)?;
        let mut current = first_word.as_str();
        let mut reply = vec![current];
        while let Some(next) = self.next_word(current, rng) {
            current = next;
            reply.push(current);
            remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                break;
            }
        }

        for _ in 0..MAX_ENDING_EXTENSION {
            if is_valid_end(current) {
                break;
            }
            let Some(next) = self.next_word(current, rng) else {
                break;
            };
            current = next;
            reply.push(current);
        }

        trace!(words = reply.len(), "generated reply");
        Some(reply.join(" "))
    }

    fn next_word<R: Rng>(&self, word: &str, rng: &mut R) -> Option<&str> {
        self.words
            .get(&word.to_lowercase())
            .and_then(|choices| choices.choose(rng))
            .map(String::as_str)
    }

    /// Ingest a flat room log: one message per line, own lines carry the marker.
    pub fn load_file(&mut self, channel: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::ReadLog {
            path: path.to_path_buf(),
            source,
        })?;
        let contents = String::from_utf8(bytes)
            .with_context(|| format!("log file {} is not valid UTF-8", path.display()))?;
        let before = self.lengths.total();
        self.load_str(channel, &contents);
        debug!(
            channel,
            path = %path.display(),
            learned = self.lengths.total() - before,
            "loaded room log"
        );
        Ok(())
    }

    /// Same as [`Self::load_file`] for in-memory log contents.
    pub fn load_str(&mut self, channel: &str, contents: &str) {
        for line in contents.split('\n') {
            if self.marker.is_empty() {
                self.add_message(channel, line);
                continue;
            }
            let own = line.starts_with(self.marker.as_str());
            let message = line.replace(self.marker.as_str(), "");
            if own {
                self.set_message(channel, &message);
            } else {
                self.add_message(channel, &message);
            }
        }
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            channels: self.last_message.len(),
            messages: self.lengths.total(),
            vocabulary: self.words.len(),
            transitions: self.words.values().map(ChoiceMap::total).sum(),
            openers: self.first_words.values().map(ChoiceMap::total).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{SeedableRng, rngs::StdRng},
        std::io::Write,
    };

    const MARK: &str = "\u{1f34d}SELF";

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn empty_message_is_ignored() {
        let mut chain = MarkovChain::new(MARK);
        chain.add_message("room", "");
        assert!(chain.last_message.is_empty());
        assert_eq!(chain.stats(), ChainStats::default());
    }

    #[test]
    fn links_previous_ending_to_next_opening() {
        let mut chain = MarkovChain::new(MARK);
        chain.add_message("room", "hello There");
        chain.add_message("room", "General kenobi");

        let openers = &chain.first_words["there"];
        assert_eq!(
            openers.weight(&("General".to_string(), Some("hello".to_string()))),
            1
        );
        assert_eq!(chain.words["general"].weight(&"kenobi".to_string()), 1);
        assert_eq!(chain.last_message["room"], "General kenobi");
    }

    #[test]
    fn channels_do_not_share_openers() {
        let mut chain = MarkovChain::new(MARK);
        chain.add_message("a", "one two");
        chain.add_message("b", "three");
        assert!(chain.first_words.is_empty());
    }

    #[test]
    fn set_message_does_not_learn() {
        let mut chain = MarkovChain::new(MARK);
        chain.set_message("room", "ping pong");
        chain.add_message("room", "ok");
        assert!(!chain.words.contains_key("ping"));
        assert_eq!(chain.first_words["pong"].total(), 1);
        assert_eq!(chain.stats().messages, 1);
    }

    #[test]
    fn reply_follows_the_only_path() {
        let mut chain = MarkovChain::new(MARK);
        chain.add_message("room", "how are you");
        chain.add_message("room", "fine thanks");
        let reply = chain.get_reply_with("so how are YOU", &mut rng());
        assert_eq!(reply.as_deref(), Some("fine thanks"));
    }

    #[test]
    fn reply_extends_past_dangling_words() {
        let mut chain = MarkovChain::new(MARK);
        chain.add_message("room", "hey");
        chain.add_message("room", "go to the park");
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(
                chain.get_reply_with("hey", &mut rng).as_deref(),
                Some("go to the park")
            );
        }
    }

    #[test]
    fn unknown_prompt_has_no_reply() {
        let mut chain = MarkovChain::new(MARK);
        assert!(chain.get_reply("anything").is_none());
        chain.add_message("room", "first");
        chain.add_message("room", "second");
        assert!(chain.get_reply_with("nobody said this", &mut rng()).is_none());
        assert!(chain.get_reply_with("", &mut rng()).is_none());
    }

    #[test]
    fn load_str_separates_own_lines() {
        let mut chain = MarkovChain::new(MARK);
        chain.load_str("room", &format!("hi there\n{MARK}hello\nanswer me\n"));
        assert!(!chain.first_words.contains_key("there"));
        assert_eq!(
            chain.first_words["hello"].weight(&("answer".to_string(), None)),
            1
        );
        assert!(!chain.words.contains_key("hello"));
        assert_eq!(chain.stats().messages, 2);
    }

    #[test]
    fn load_str_strips_marker_everywhere() {
        let mut chain = MarkovChain::new(MARK);
        chain.load_str("room", &format!("quote {MARK}this"));
        assert_eq!(chain.words["quote"].weight(&"this".to_string()), 1);
    }

    #[test]
    fn empty_marker_treats_every_line_as_foreign() {
        let mut chain = MarkovChain::new("");
        chain.load_str("room", "a b\nc d");
        assert_eq!(chain.stats().messages, 2);
    }

    #[test]
    fn load_file_reads_log() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "how are you").unwrap();
        writeln!(file, "{MARK}fine thanks").unwrap();
        writeln!(file, "great").unwrap();

        let mut chain = MarkovChain::new(MARK);
        chain.load_file("matrix_room", file.path()).unwrap();
        let stats = chain.stats();
        assert_eq!(stats.channels, 1);
        assert_eq!(stats.messages, 2);
        assert_eq!(chain.last_message["matrix_room"], "great");
    }

    #[test]
    fn load_file_missing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut chain = MarkovChain::new(MARK);
        let err = chain
            .load_file("room", dir.path().join("missing.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::ReadLog { .. }));
    }

    #[test]
    fn load_file_rejects_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9 au lait\n").unwrap();

        let mut chain = MarkovChain::new(MARK);
        let err = chain.load_file("room", file.path()).unwrap_err();
        assert!(matches!(err, Error::Message(_)));
        assert!(err.to_string().contains("not valid UTF-8"));
        assert_eq!(chain.stats(), ChainStats::default());
    }
}
