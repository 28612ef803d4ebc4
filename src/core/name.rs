use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_NAME_PREFIX: &str = "Espace Élèves - ";

static TRAILING_CLASS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*\)$").expect("class tag pattern is valid"));

/// 把頁首文字 "Espace Élèves - BOURGEOIS Louis (1RE3)" 轉成 "Louis BOURGEOIS"
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    prefix: String,
}

impl NameNormalizer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 網站把姓放在最前面；只有姓是單一字詞時才會排對。
    pub fn normalize(&self, raw: &str) -> String {
        let without_prefix = raw.strip_prefix(self.prefix.as_str()).unwrap_or(raw);
        let remainder = TRAILING_CLASS_TAG.replace(without_prefix, "");
        let remainder = remainder.trim();

        let parts: Vec<&str> = remainder.split_whitespace().collect();
        match parts.split_first() {
            Some((last_name, given)) if !given.is_empty() => {
                format!("{} {}", given.join(" "), last_name)
            }
            _ => remainder.to_string(),
        }
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorders_last_name_after_given_name() {
        let normalizer = NameNormalizer::new("PREFIX - ");
        assert_eq!(
            normalizer.normalize("PREFIX - BOURGEOIS Louis (1RE3)"),
            "Louis BOURGEOIS"
        );
    }

    #[test]
    fn test_single_token_is_returned_unchanged() {
        let normalizer = NameNormalizer::new("PREFIX - ");
        assert_eq!(normalizer.normalize("PREFIX - Solo"), "Solo");
        assert_eq!(normalizer.normalize("PREFIX -   Solo  "), "Solo");
    }

    #[test]
    fn test_default_prefix_and_compound_given_name() {
        let normalizer = NameNormalizer::default();
        assert_eq!(
            normalizer.normalize("Espace Élèves - MARTIN Jean Pierre (TG2)"),
            "Jean Pierre MARTIN"
        );
    }

    #[test]
    fn test_missing_prefix_still_strips_class_tag() {
        let normalizer = NameNormalizer::default();
        assert_eq!(normalizer.normalize("DUPONT Claire   (2NDE4)"), "Claire DUPONT");
    }

    #[test]
    fn test_empty_remainder() {
        let normalizer = NameNormalizer::default();
        assert_eq!(normalizer.normalize("Espace Élèves - "), "");
    }
}
