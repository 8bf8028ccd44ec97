//! Keyword classifier assigning transactions to jars
//!
//! Classification is an ordered list of keyword rules, one per jar, checked
//! in a fixed priority: FFA, NEC, EDU, LTSS, PLY, GIV. The description is
//! lower-cased and searched for each keyword as a substring; the first rule
//! with a hit wins. A description matching several jars therefore lands in
//! the one earliest in that order (e.g. "salary for rent" is FFA).
//!
//! When nothing matches, the configured [`Fallback`] decides: a fixed jar
//! (Necessities by default) or a uniform random pick.

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::config::JarSettings;
use crate::models::{JarCode, Transaction};

/// Order in which jar rules are evaluated
pub const PRIORITY: [JarCode; 6] = [
    JarCode::Ffa,
    JarCode::Nec,
    JarCode::Edu,
    JarCode::Ltss,
    JarCode::Ply,
    JarCode::Giv,
];

/// Built-in keywords for a jar (lower case, English and Vietnamese)
pub fn builtin_keywords(jar: JarCode) -> &'static [&'static str] {
    match jar {
        JarCode::Ffa => &[
            "lương",
            "salary",
            "lãi",
            "interest",
            "đầu tư",
            "investment",
            "cổ phiếu",
            "stock",
        ],
        JarCode::Nec => &[
            "ăn uống",
            "food",
            "mua sắm",
            "shopping",
            "điện",
            "electricity",
            "điện thoại",
            "phone",
            "đồ ăn",
            "groceries",
            "utilities",
            "gas",
            "water",
            "transport",
            "xe buýt",
            "bus",
            "taxi",
            "grab",
            "nhà",
            "rent",
            "housing",
        ],
        JarCode::Edu => &[
            "sách",
            "book",
            "học",
            "study",
            "học phí",
            "tuition",
            "course",
            "khóa học",
        ],
        JarCode::Ltss => &[
            "tiết kiệm",
            "saving",
            "long-term",
            "chuyển tiền tiết kiệm",
            "emergency fund",
        ],
        JarCode::Ply => &[
            "giải trí",
            "entertainment",
            "mua đồ chơi",
            "toy",
            "vui chơi",
            "play",
            "du lịch",
            "travel",
            "party",
            "game",
        ],
        JarCode::Giv => &[
            "từ thiện",
            "charity",
            "cho mẹ",
            "cho ba",
            "ủng hộ",
            "donate",
            "give",
            "help",
        ],
    }
}

/// What to return when no keyword matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Always the given jar
    Default(JarCode),
    /// Uniform choice among all six jars
    Random,
}

impl Default for Fallback {
    fn default() -> Self {
        Self::Default(JarCode::Nec)
    }
}

impl std::str::FromStr for Fallback {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("random") {
            Ok(Self::Random)
        } else {
            s.parse().map(Self::Default)
        }
    }
}

/// A jar paired with the keywords that select it
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub jar: JarCode,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(jar: JarCode, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            jar,
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    /// First keyword found in an already lower-cased description
    fn find_match(&self, lowered: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
    }
}

/// How a jar was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Stored label or user override on the transaction
    Label,
    /// Keyword match
    Keyword,
    /// No match; fallback applied
    Fallback,
}

/// A classification with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub jar: JarCode,
    pub source: ClassificationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

/// Ordered keyword classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<KeywordRule>,
    fallback: Fallback,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Built-in rules in priority order with the Necessities fallback
    pub fn new() -> Self {
        let rules = PRIORITY
            .iter()
            .map(|jar| KeywordRule::new(*jar, builtin_keywords(*jar).iter().copied()))
            .collect();
        Self {
            rules,
            fallback: Fallback::default(),
        }
    }

    /// Custom rules, evaluated in the given order
    pub fn with_rules(rules: Vec<KeywordRule>, fallback: Fallback) -> Self {
        Self { rules, fallback }
    }

    /// Built-in rules extended with the settings' extra keywords and fallback
    pub fn from_settings(settings: &JarSettings) -> Self {
        let mut classifier = Self::new().with_fallback(settings.fallback());
        for rule in &mut classifier.rules {
            rule.keywords
                .extend(settings.keywords(rule.jar).iter().cloned());
        }
        classifier
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    /// Jar for a free-text description
    pub fn classify(&self, description: &str) -> JarCode {
        self.explain(description).jar
    }

    /// Jar for a description, with the keyword that decided it
    pub fn explain(&self, description: &str) -> Classification {
        let lowered = description.to_lowercase();

        for rule in &self.rules {
            if let Some(keyword) = rule.find_match(&lowered) {
                trace!(jar = %rule.jar, keyword, "Keyword match");
                return Classification {
                    jar: rule.jar,
                    source: ClassificationSource::Keyword,
                    matched_keyword: Some(keyword.to_string()),
                };
            }
        }

        let jar = match self.fallback {
            Fallback::Default(jar) => jar,
            Fallback::Random => random_jar(),
        };
        Classification {
            jar,
            source: ClassificationSource::Fallback,
            matched_keyword: None,
        }
    }

    /// Jar for a transaction: its label if set, otherwise the heuristic
    pub fn jar_for(&self, tx: &Transaction) -> JarCode {
        self.explain_transaction(tx).jar
    }

    pub fn explain_transaction(&self, tx: &Transaction) -> Classification {
        match tx.category_label {
            Some(jar) => Classification {
                jar,
                source: ClassificationSource::Label,
                matched_keyword: None,
            },
            None => self.explain(&tx.msg_content),
        }
    }
}

fn random_jar() -> JarCode {
    let idx = (Uuid::new_v4().as_u128() % JarCode::ALL.len() as u128) as usize;
    JarCode::ALL[idx]
}
