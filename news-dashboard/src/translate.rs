use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display languages offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Fr,
    Es,
    Zh,
}

impl Language {
    pub const ALL: [Language; 5] = [Language::En, Language::De, Language::Fr, Language::Es, Language::Zh];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::Zh => "zh",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_uppercase())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.code() == code)
            .ok_or_else(|| format!("unsupported language '{}', expected one of: en, de, fr, es, zh", s))
    }
}

/// Translates headline and summary text into a target language
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// Placeholder translator that returns its input unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughTranslator;

#[async_trait]
impl Translator for PassThroughTranslator {
    fn name(&self) -> &str {
        "pass-through"
    }

    async fn translate(&self, text: &str, _target: Language) -> Result<String> {
        Ok(text.to_string())
    }
}
