// Deterministic fallback classification
//
// Ordered substring rules; the first rule with a matching cue wins and a
// message matching nothing is `Other`. Rule order is significant because a
// message can contain cues of several rules.

use crate::config::{default_fallback_rules, FallbackRule};
use crate::types::Category;

#[derive(Debug, Clone)]
pub struct FallbackRuleEngine {
    rules: Vec<FallbackRule>,
}

impl Default for FallbackRuleEngine {
    fn default() -> Self {
        Self::from_config(&default_fallback_rules())
    }
}

impl FallbackRuleEngine {
    pub fn from_config(rules: &[FallbackRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    pub fn classify(&self, text: &str) -> Category {
        self.rules
            .iter()
            .find(|rule| {
                rule.cues
                    .iter()
                    .any(|cue| !cue.is_empty() && text.contains(cue.as_str()))
            })
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }

    pub fn classify_all<S: AsRef<str>>(&self, messages: &[S]) -> Vec<Category> {
        messages.iter().map(|m| self.classify(m.as_ref())).collect()
    }
}

/// Classify with the built-in rule set
pub fn fallback_classify(text: &str) -> Category {
    FallbackRuleEngine::default().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_per_category() {
        assert_eq!(fallback_classify("パスワードの変更方法は？"), Category::OperationHowTo);
        assert_eq!(fallback_classify("メニューが見当たらない"), Category::FeatureLocation);
        assert_eq!(fallback_classify("保存に失敗しました"), Category::ErrorTrouble);
        assert_eq!(fallback_classify("ダークモードを追加してほしい"), Category::FeatureRequest);
        assert_eq!(fallback_classify("ありがとうございました"), Category::Other);
    }

    #[test]
    fn test_how_to_wins_over_error() {
        // "どうやって" (rule 1) and "エラー" (rule 3)
        assert_eq!(
            fallback_classify("エラーはどうやって解消しますか"),
            Category::OperationHowTo
        );
    }

    #[test]
    fn test_location_wins_over_request() {
        assert_eq!(fallback_classify("設定に自動保存を追加して"), Category::FeatureLocation);
    }

    #[test]
    fn test_empty_text_is_other() {
        assert_eq!(fallback_classify(""), Category::Other);
    }

    #[test]
    fn test_custom_rules_respect_order() {
        let engine = FallbackRuleEngine::from_config(&[
            FallbackRule::new(Category::FeatureRequest, &["please"]),
            FallbackRule::new(Category::ErrorTrouble, &["crash"]),
        ]);
        assert_eq!(engine.classify("please fix the crash"), Category::FeatureRequest);
        assert_eq!(engine.classify("it crashed"), Category::ErrorTrouble);
        assert_eq!(engine.classify("hello"), Category::Other);
    }

    #[test]
    fn test_empty_rule_list_is_all_other() {
        let engine = FallbackRuleEngine::from_config(&[]);
        assert_eq!(engine.classify_all(&["エラー", "方法"]), vec![Category::Other; 2]);
    }
}
