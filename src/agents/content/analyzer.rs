//! Keyword heuristics for French text: sentiment, topics, entities.
//!
//! Placeholder analysis. Nothing here calls a model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "adore", "agréable", "aime", "bien", "bon", "bonne", "bravo", "content", "contente",
    "efficace", "excellent", "excellente", "fantastique", "formidable", "génial", "géniale",
    "heureux", "heureuse", "magnifique", "merci", "merveilleux", "parfait", "parfaite", "ravi",
    "ravie", "réussi", "satisfait", "satisfaite", "super", "top",
];

const NEGATIVE_WORDS: &[&str] = &[
    "cassé", "catastrophe", "colère", "décevant", "décevante", "déçu", "déçue", "déteste",
    "difficile", "échec", "énervé", "horrible", "inutile", "lent", "mal", "malheureux",
    "mauvais", "mauvaise", "médiocre", "nul", "nulle", "panne", "pire", "problème", "terrible",
    "triste",
];

const TOPICS: &[(&str, &[&str])] = &[
    (
        "technologie",
        &[
            "technologie", "technologique", "technologiques", "numérique", "logiciel",
            "logiciels", "application", "ordinateur", "internet", "smartphone", "innovation",
            "données", "algorithme", "robot", "intelligence",
        ],
    ),
    (
        "politique",
        &[
            "politique", "gouvernement", "élection", "élections", "ministre", "président",
            "loi", "vote", "parlement", "député",
        ],
    ),
    (
        "économie",
        &[
            "économie", "économique", "marché", "entreprise", "entreprises", "prix", "emploi",
            "croissance", "inflation", "finance", "banque",
        ],
    ),
    (
        "sport",
        &[
            "sport", "football", "match", "équipe", "joueur", "championnat", "victoire",
            "olympique", "tennis", "rugby",
        ],
    ),
    (
        "culture",
        &[
            "culture", "culturel", "musique", "film", "cinéma", "livre", "art", "exposition",
            "concert", "théâtre",
        ],
    ),
    (
        "santé",
        &[
            "santé", "médecin", "hôpital", "maladie", "vaccin", "traitement", "soins",
            "patient", "médical",
        ],
    ),
    (
        "environnement",
        &[
            "environnement", "climat", "climatique", "écologie", "écologique", "pollution",
            "énergie", "recyclage", "nature", "biodiversité",
        ],
    ),
];

const FRENCH_MARKERS: &[&str] = &[
    "le", "la", "les", "de", "des", "du", "et", "est", "je", "suis", "un", "une", "ce",
    "cette", "très", "pour", "dans", "avec", "pas", "nous", "vous", "sur",
];

const ENGLISH_MARKERS: &[&str] = &[
    "the", "and", "is", "are", "of", "to", "in", "it", "you", "this", "that", "with", "for",
    "not", "very", "we",
];

/// Capitalized words that start sentences rather than name things
const CAPITALIZED_STOPWORDS: &[&str] = &[
    "Je", "Tu", "Il", "Elle", "On", "Nous", "Vous", "Ils", "Elles", "Le", "La", "Les", "Un",
    "Une", "Des", "Ce", "Cette", "Ces", "Mais", "Et", "Ou", "Donc", "Car", "En", "Au", "Aux",
    "Du", "De", "Pour", "Dans", "Avec", "Sur", "Par", "Si", "Quand", "The", "This", "It",
];

const IMAGE_FORMATS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "tiff"];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{N}]*").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").unwrap());
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());
static PROPER_NOUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)*").unwrap());

/// Which parts of a text analysis to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default = "enabled")]
    pub sentiment: bool,
    #[serde(default = "enabled")]
    pub topics: bool,
    #[serde(default = "enabled")]
    pub entities: bool,
}

fn enabled() -> bool {
    true
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sentiment: true,
            topics: true,
            entities: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// In `[-1, 1]`; 0 when no sentiment word was found
    pub score: f64,
    pub positive_count: usize,
    pub negative_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub confidence: f64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    ProperNoun,
    Mention,
    Hashtag,
    Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub word_count: usize,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<Topic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub url: String,
    pub format: Option<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    /// `likes + 2 * shares + 3 * comments`, saturating at `u64::MAX`
    pub score: u64,
    pub level: EngagementLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: TextAnalysis,
    pub engagement: Engagement,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn tokens(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn count_in(words: &[String], list: &[&str]) -> usize {
    words.iter().filter(|w| list.contains(&w.as_str())).count()
}

pub fn sentiment(words: &[String]) -> Sentiment {
    let positive_count = count_in(words, POSITIVE_WORDS);
    let negative_count = count_in(words, NEGATIVE_WORDS);
    let total = positive_count + negative_count;

    let label = if positive_count > negative_count {
        SentimentLabel::Positive
    } else if negative_count > positive_count {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };
    let score = if total == 0 {
        0.0
    } else {
        round2((positive_count as f64 - negative_count as f64) / total as f64)
    };

    Sentiment {
        label,
        score,
        positive_count,
        negative_count,
    }
}

/// Topics whose keywords occur in `words`, highest confidence first
pub fn topics(words: &[String]) -> Vec<Topic> {
    let mut found: Vec<Topic> = TOPICS
        .iter()
        .filter_map(|(name, keywords)| {
            let mut matched: Vec<String> = Vec::new();
            for word in words {
                if keywords.contains(&word.as_str()) && !matched.contains(word) {
                    matched.push(word.clone());
                }
            }
            if matched.is_empty() {
                return None;
            }
            Some(Topic {
                name: name.to_string(),
                confidence: round2((matched.len() as f64 / 3.0).min(1.0)),
                keywords: matched,
            })
        })
        .collect();

    found.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.name.cmp(&b.name))
    });
    found
}

/// URLs, then mentions, hashtags, and proper nouns, each deduplicated
pub fn entities(text: &str) -> Vec<Entity> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut push = |text: String, kind: EntityKind| {
        if seen.insert((text.clone(), kind)) {
            found.push(Entity { text, kind });
        }
    };

    for m in URL_RE.find_iter(text) {
        push(m.as_str().to_string(), EntityKind::Url);
    }
    let without_urls = URL_RE.replace_all(text, " ");

    for caps in MENTION_RE.captures_iter(&without_urls) {
        push(format!("@{}", &caps[1]), EntityKind::Mention);
    }
    for caps in HASHTAG_RE.captures_iter(&without_urls) {
        push(format!("#{}", &caps[1]), EntityKind::Hashtag);
    }

    let plain = HASHTAG_RE.replace_all(&MENTION_RE.replace_all(&without_urls, " "), " ")
        .into_owned();
    for m in PROPER_NOUN_RE.find_iter(&plain) {
        let phrase: Vec<&str> = m
            .as_str()
            .split_whitespace()
            .skip_while(|w| CAPITALIZED_STOPWORDS.contains(w))
            .collect();
        if !phrase.is_empty() {
            push(phrase.join(" "), EntityKind::ProperNoun);
        }
    }

    found
}

pub fn guess_language(words: &[String]) -> &'static str {
    let french = count_in(words, FRENCH_MARKERS);
    let english = count_in(words, ENGLISH_MARKERS);
    if french == 0 && english == 0 {
        "unknown"
    } else if english > french {
        "en"
    } else {
        "fr"
    }
}

pub fn analyze_text(text: &str, options: AnalysisOptions) -> TextAnalysis {
    let words = tokens(text);
    TextAnalysis {
        word_count: words.len(),
        language: guess_language(&words).to_string(),
        sentiment: options.sentiment.then(|| sentiment(&words)),
        topics: options.topics.then(|| topics(&words)),
        entities: options.entities.then(|| entities(text)),
    }
}

/// Lowercased file extension of the URL path, when it names an image format
pub fn image_format(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, extension) = file.rsplit_once('.')?;
    let extension = extension.to_lowercase();
    IMAGE_FORMATS
        .contains(&extension.as_str())
        .then_some(extension)
}

pub fn analyze_image(url: &str, description: Option<&str>) -> ImageAnalysis {
    const IGNORED: &[&str] = &["http", "https", "www", "com", "org", "net", "fr", "img", "image"];

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut labels: Vec<String> = Vec::new();
    let candidates = tokens(path)
        .into_iter()
        .chain(description.map(tokens).unwrap_or_default());
    for word in candidates {
        if word.chars().count() < 3
            || IGNORED.contains(&word.as_str())
            || IMAGE_FORMATS.contains(&word.as_str())
            || FRENCH_MARKERS.contains(&word.as_str())
            || ENGLISH_MARKERS.contains(&word.as_str())
            || labels.contains(&word)
        {
            continue;
        }
        labels.push(word);
        if labels.len() == 10 {
            break;
        }
    }

    ImageAnalysis {
        url: url.to_string(),
        format: image_format(url),
        labels,
        sentiment: description.map(|d| sentiment(&tokens(d))),
    }
}

pub fn engagement(likes: u64, shares: u64, comments: u64) -> Engagement {
    let score = likes
        .saturating_add(shares.saturating_mul(2))
        .saturating_add(comments.saturating_mul(3));
    let level = match score {
        0..=9 => EngagementLevel::Low,
        10..=99 => EngagementLevel::Medium,
        _ => EngagementLevel::High,
    };
    Engagement {
        likes,
        shares,
        comments,
        score,
        level,
    }
}
