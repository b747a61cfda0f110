//! Task classification for model selection.
//!
//! The latest user message is matched against a declarative keyword table
//! to pick a coarse task category, which in turn decides which model the
//! registry should try first.

/// Coarse task categories used to pick a preferred model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    Math,
    Research,
    Analysis,
    Coding,
    Creative,
    Reasoning,
    General,
}

/// Keyword table, checked in order; first row with a hit wins.
/// Matching is lowercase substring containment.
const KEYWORD_TABLE: &[(&[&str], TaskCategory)] = &[
    (
        &["calculate", "math", "equation", "solve", "compute", "%", "percent"],
        TaskCategory::Math,
    ),
    (
        &["research", "paper", "study", "academic", "arxiv", "latest research"],
        TaskCategory::Research,
    ),
    (
        &["analyze", "analysis", "compare", "evaluate"],
        TaskCategory::Analysis,
    ),
    (
        &["code", "programming", "python", "javascript", "debug"],
        TaskCategory::Coding,
    ),
    (
        &["write", "story", "poem", "creative", "imagine"],
        TaskCategory::Creative,
    ),
    (
        &["reason", "logic", "think", "explain", "why"],
        TaskCategory::Reasoning,
    ),
];

/// Classify a user message into a task category.
pub fn classify(message: &str) -> TaskCategory {
    let lower = message.to_lowercase();
    for (keywords, category) in KEYWORD_TABLE {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *category;
        }
    }
    TaskCategory::General
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_sign_is_math() {
        assert_eq!(classify("Calculate 15% of 2,500"), TaskCategory::Math);
        assert_eq!(classify("what is 3 % of 9"), TaskCategory::Math);
    }

    #[test]
    fn math_keywords() {
        assert_eq!(classify("solve this equation"), TaskCategory::Math);
        assert_eq!(classify("Compute the total"), TaskCategory::Math);
    }

    #[test]
    fn research_keywords() {
        assert_eq!(
            classify("Latest research on quantum computing"),
            TaskCategory::Research
        );
        assert_eq!(classify("find me a paper on LLMs"), TaskCategory::Research);
    }

    #[test]
    fn coding_keywords() {
        assert_eq!(classify("debug my python script"), TaskCategory::Coding);
        assert_eq!(classify("review this CODE please"), TaskCategory::Coding);
    }

    #[test]
    fn creative_and_reasoning() {
        assert_eq!(classify("write a poem about rust"), TaskCategory::Creative);
        assert_eq!(classify("why is the sky blue"), TaskCategory::Reasoning);
    }

    #[test]
    fn table_order_wins_on_overlap() {
        // "calculate" precedes "analyze" in the table.
        assert_eq!(
            classify("analyze and calculate the variance"),
            TaskCategory::Math
        );
    }

    #[test]
    fn no_match_is_general() {
        assert_eq!(classify("hello there"), TaskCategory::General);
        assert_eq!(classify(""), TaskCategory::General);
    }
}
