use crate::models::{ContentMetrics, KeywordFrequency};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

const TOP_KEYWORDS: usize = 10;
const MIN_KEYWORD_LEN: usize = 3;

/// Elements whose text is navigation or boilerplate rather than content
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "template", "svg",
    "form", "iframe", "button",
];

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "new", "now", "see", "two", "who",
    "did", "get", "him", "let", "she", "too", "use", "with", "this", "that", "from", "they",
    "will", "your", "have", "more", "been", "were", "what", "when", "than", "them", "then",
    "there", "these", "their", "which", "about", "would", "into", "also", "just",
];

static CONTENT_ROOT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["main", "article", "[role='main']", "body"]
        .iter()
        .map(|css| Selector::parse(css).expect("content root selector should be valid"))
        .collect()
});
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("p selector should be valid"));
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector should be valid")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector should be valid"));

pub struct ContentAnalyzer;

impl ContentAnalyzer {
    /// Content-quality metrics for the page's main content.
    ///
    /// `target_keyword` selects which density is reported as `keyword_density`;
    /// without one the top keyword's density is used.
    pub fn analyze(document: &Html, target_keyword: Option<&str>) -> ContentMetrics {
        let root = CONTENT_ROOT_SELECTORS
            .iter()
            .find_map(|selector| document.select(selector).next())
            .unwrap_or_else(|| document.root_element());

        let mut raw = String::new();
        collect_text(root, &mut raw);
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        let words = tokenize(&text);
        let word_count = words.len();
        let sentence_count = count_sentences(&text, word_count);
        let top_keywords = top_keywords(&words);

        let target_keyword = target_keyword
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        let keyword_density = match &target_keyword {
            Some(keyword) => phrase_density(&words, keyword),
            None => top_keywords.first().map(|k| k.density).unwrap_or(0.0),
        };

        ContentMetrics {
            word_count,
            character_count: text.chars().count(),
            sentence_count,
            paragraph_count: root.select(&PARAGRAPH_SELECTOR).count(),
            heading_count: root.select(&HEADING_SELECTOR).count(),
            link_count: root.select(&LINK_SELECTOR).count(),
            image_count: root.select(&IMG_SELECTOR).count(),
            readability_score: flesch_reading_ease(&words, sentence_count),
            top_keywords,
            keyword_density,
            target_keyword,
        }
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(&text.text);
                out.push(' ');
            }
            Node::Element(el) if BOILERPLATE_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

/// Lowercased words; tokens without a letter (numbers, symbols) are dropped
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|token| token.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|token| token.chars().any(char::is_alphabetic))
        .map(str::to_lowercase)
        .collect()
}

fn count_sentences(text: &str, word_count: usize) -> usize {
    if word_count == 0 {
        return 0;
    }
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|part| part.chars().any(char::is_alphanumeric))
        .count();
    sentences.max(1)
}

/// Vowel-group syllable estimate, at least one per word
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let mut count = 0;
    let mut previous_was_vowel = false;

    for c in word.chars() {
        let is_vowel = "aeiouyáéíóúůýěäöü".contains(c);
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }

    // Silent trailing "e" (but not "-le" as in "table")
    if count > 1 && word.ends_with('e') && !word.ends_with("le") {
        count -= 1;
    }

    count.max(1)
}

/// Flesch Reading Ease clamped to 0..=100, one decimal
fn flesch_reading_ease(words: &[String], sentence_count: usize) -> f64 {
    if words.is_empty() || sentence_count == 0 {
        return 0.0;
    }

    let word_count = words.len() as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let words_per_sentence = word_count / sentence_count as f64;
    let syllables_per_word = syllables as f64 / word_count;

    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    round_to(score.clamp(0.0, 100.0), 1)
}

fn top_keywords(words: &[String]) -> Vec<KeywordFrequency> {
    // keyword -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        if word.chars().count() < MIN_KEYWORD_LEN || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word.as_str()).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(keyword, count, _)| KeywordFrequency {
            keyword: keyword.to_string(),
            count,
            density: percentage(count, words.len()),
        })
        .collect()
}

/// Occurrences of a (possibly multi-word) phrase per hundred words
fn phrase_density(words: &[String], phrase: &str) -> f64 {
    let phrase = tokenize(phrase);
    if phrase.is_empty() || words.len() < phrase.len() {
        return 0.0;
    }

    let occurrences = words
        .windows(phrase.len())
        .filter(|window| *window == phrase.as_slice())
        .count();
    percentage(occurrences, words.len())
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
