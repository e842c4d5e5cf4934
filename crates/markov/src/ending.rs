/// Words a generated reply should not stop on.
const DANGLING_WORDS: &[&str] = &[
    "about", "as", "from", "a", "he", "be", "to", "wanted", "want", "has", "get", "says", "most",
    "mostly", "got", "she", "just", "we", "they", "the", "of", "or", "i", "ur", "with", "your",
    "gonna", "my", "their", "and", "it's", "its", "but", "ima", "what's", "whats", "wheres",
    "where's", "whos", "who's", "an", "it", "our", "hes", "he's", "thats", "that's", "also",
    "theres", "there's", "ive", "by", "theyre",
];

const DANGLING_SUFFIXES: &[&str] = &[",", "&", "-", "'re", "'ll", "'d", "'ve"];

/// Whether `word` reads as a natural place to end a sentence.
pub fn is_valid_end(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    if DANGLING_WORDS.contains(&lower.as_str()) {
        return false;
    }
    !DANGLING_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("pizza", true)]
    #[case("done.", true)]
    #[case("the", false)]
    #[case("The", false)]
    #[case("WHO'S", false)]
    #[case("apples,", false)]
    #[case("rock&", false)]
    #[case("they're", false)]
    #[case("we'll", false)]
    #[case("i'd", false)]
    #[case("could've", false)]
    #[case("", true)]
    fn valid_ends(#[case] word: &str, #[case] expected: bool) {
        assert_eq!(is_valid_end(word), expected);
    }
}
