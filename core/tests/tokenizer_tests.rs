use bisearch_core::tokenizer::{normalize_term, tokenize};

#[test]
fn it_lowercases_both_alphabets() {
    let toks = tokenize("The Quick БЫСТРАЯ Лиса");
    assert_eq!(toks, vec!["the", "quick", "быстрая", "лиса"]);
}

#[test]
fn it_keeps_in_word_connectors() {
    let toks = tokenize("well-known don't 3.14 c+j");
    assert_eq!(toks, vec!["well-known", "don't", "3.14", "c+j"]);
}

#[test]
fn it_splits_on_punctuation_and_symbols() {
    let toks = tokenize("cats, dogs; (fish) \"birds\"!");
    assert_eq!(toks, vec!["cats", "dogs", "fish", "birds"]);
}

#[test]
fn query_normalization_matches_corpus_normalization() {
    for word in ["Ёлка", "MOSCOW", "Привет", "mixed-Case"] {
        let corpus_side = tokenize(word);
        assert_eq!(corpus_side, vec![normalize_term(word)]);
    }
}
