//! Speech response interpreter: every yes/no classification goes through here.
//!
//! Tier 1 matches whole-word keyword phrases (affirmative before negative).
//! An affirmative phrase only counts when no negator precedes it in the same
//! clause and "not" does not follow it directly.
//! Tier 2 asks the LLM for a single label; anything but an allowed label is
//! treated as unclear.

use std::sync::LazyLock;

use regex::Regex;

use super::llm::LlmClassifier;
use crate::models::Classification;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9']+").expect("valid word regex"));

static CLAUSE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,;:!?]+").expect("valid clause regex"));

const AFFIRMATIVE_PHRASES: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "taken",
    "took it",
    "i took",
    "already took",
    "done",
    "i did",
    "did it",
    "sure did",
    "of course",
];

const NEGATIVE_PHRASES: &[&str] = &[
    "no",
    "nope",
    "not yet",
    "not",
    "haven't",
    "havent",
    "didn't",
    "didnt",
    "don't",
    "dont",
    "never",
    "forgot",
    "later",
];

/// Words that flip any affirmative phrase later in the same clause
/// ("I have not yet taken it", "I don't think I took it").
const NEGATORS: &[&str] = &[
    "not", "never", "haven't", "havent", "hasn't", "hasnt", "didn't", "didnt", "don't", "dont",
    "can't", "cant", "cannot", "won't", "wont",
];

/// Words that flip an affirmative phrase directly before them ("I did not").
const TRAILING_NEGATORS: &[&str] = &["not", "never"];

const LLM_LABELS: [&str; 3] = ["yes", "no", "unclear"];

pub struct SpeechInterpreter {
    llm: Option<LlmClassifier>,
}

impl SpeechInterpreter {
    pub fn keyword_only() -> Self {
        Self { llm: None }
    }

    pub fn with_llm(classifier: LlmClassifier) -> Self {
        Self { llm: Some(classifier) }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Classify `utterance`, spoken in answer to `question`.
    pub fn interpret(&self, utterance: &str, question: &str) -> Classification {
        if let Some(label) = classify_keywords(utterance) {
            return label;
        }
        if tokenize(utterance).is_empty() {
            return Classification::Unclear;
        }

        let Some(llm) = &self.llm else {
            return Classification::Unclear;
        };

        match llm.classify(utterance, question, &LLM_LABELS) {
            Ok(answer) => match answer.as_str() {
                "yes" => Classification::Confirmed,
                "no" => Classification::Declined,
                "unclear" => Classification::Unclear,
                other => {
                    tracing::debug!(answer = %other, "LLM answer outside allowed labels");
                    Classification::Unclear
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM fallback failed, treating response as unclear");
                Classification::Unclear
            }
        }
    }
}

/// Keyword tier alone. `None` when no phrase matched.
pub fn classify_keywords(utterance: &str) -> Option<Classification> {
    let clauses: Vec<Vec<String>> = CLAUSE_BREAK
        .split(utterance)
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty())
        .collect();
    if clauses.is_empty() {
        return None;
    }

    if clauses.iter().any(|tokens| clause_affirms(tokens)) {
        return Some(Classification::Confirmed);
    }

    let declined = clauses.iter().any(|tokens| {
        NEGATIVE_PHRASES
            .iter()
            .any(|phrase| !find_phrase(tokens, phrase).is_empty())
    });
    declined.then_some(Classification::Declined)
}

fn clause_affirms(tokens: &[String]) -> bool {
    AFFIRMATIVE_PHRASES.iter().any(|phrase| {
        let len = phrase.split_whitespace().count();
        find_phrase(tokens, phrase).into_iter().any(|start| {
            let negated_before = tokens[..start]
                .iter()
                .any(|t| NEGATORS.contains(&t.as_str()));
            let negated_after = tokens
                .get(start + len)
                .is_some_and(|t| TRAILING_NEGATORS.contains(&t.as_str()));
            !negated_before && !negated_after
        })
    })
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Start indexes of every occurrence of `phrase` as a whole-token sequence.
fn find_phrase(tokens: &[String], phrase: &str) -> Vec<usize> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return Vec::new();
    }
    (0..=tokens.len() - words.len())
        .filter(|&i| words.iter().enumerate().all(|(j, w)| tokens[i + j] == *w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::llm::{LlmClassifier, LlmError};
    use crate::reminders::traits::LlmClient;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const QUESTION: &str = "Did you take your Donepezil?";

    struct CountingLlm {
        answer: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl CountingLlm {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self { answer: Ok(answer), calls: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { answer: Err(()), calls: AtomicUsize::new(0) })
        }
    }

    impl LlmClient for CountingLlm {
        fn generate(&self, _model: &str, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .map(str::to_string)
                .map_err(|_| LlmError::Connection("http://localhost:11434".into()))
        }
    }

    fn interpreter(llm: &Arc<CountingLlm>) -> SpeechInterpreter {
        SpeechInterpreter::with_llm(LlmClassifier::new(llm.clone(), "medgemma:4b"))
    }

    #[test]
    fn affirmative_keywords_skip_llm() {
        let llm = CountingLlm::answering("no");
        let result = interpreter(&llm).interpret("yeah I already took it", QUESTION);
        assert_eq!(result, Classification::Confirmed);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn affirmative_checked_before_negative() {
        // "no problem, I took it" contains both vocabularies
        assert_eq!(classify_keywords("No problem, I took it"), Some(Classification::Confirmed));
    }

    #[test]
    fn negative_keywords() {
        for phrase in ["No", "not yet", "I forgot", "I'll do it later", "I didn't", "nope"] {
            assert_eq!(classify_keywords(phrase), Some(Classification::Declined), "{phrase}");
        }
    }

    #[test]
    fn negated_affirmative_is_declined() {
        assert_eq!(classify_keywords("I have not taken it"), Some(Classification::Declined));
        assert_eq!(classify_keywords("never taken"), Some(Classification::Declined));
    }

    #[test]
    fn negation_reaches_across_the_clause() {
        assert_eq!(classify_keywords("I have not yet taken it"), Some(Classification::Declined));
        assert_eq!(classify_keywords("I don't think I took it"), Some(Classification::Declined));
        assert_eq!(classify_keywords("I did not"), Some(Classification::Declined));
    }

    #[test]
    fn negation_stops_at_clause_break() {
        assert_eq!(classify_keywords("No. Yes."), Some(Classification::Confirmed));
        assert_eq!(classify_keywords("Not at first, but yes"), Some(Classification::Confirmed));
        assert_eq!(classify_keywords("no I took it"), Some(Classification::Confirmed));
    }

    #[test]
    fn matches_whole_words_only() {
        // "yesterday" and "nobody" must not trigger yes/no
        assert_eq!(classify_keywords("yesterday nobody called"), None);
    }

    #[test]
    fn curly_apostrophe_is_normalized() {
        assert_eq!(classify_keywords("I didn\u{2019}t"), Some(Classification::Declined));
    }

    #[test]
    fn ambiguous_speech_falls_back_to_llm() {
        let llm = CountingLlm::answering("yes");
        let result = interpreter(&llm).interpret("hmm, I think so maybe", QUESTION);
        assert_eq!(result, Classification::Confirmed);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn llm_answer_outside_labels_is_unclear() {
        let llm = CountingLlm::answering("Probably");
        let result = interpreter(&llm).interpret("hmm, I think so maybe", QUESTION);
        assert_eq!(result, Classification::Unclear);
    }

    #[test]
    fn llm_labels_map_to_classifications() {
        assert_eq!(interpreter(&CountingLlm::answering("NO")).interpret("hmm", QUESTION), Classification::Declined);
        assert_eq!(interpreter(&CountingLlm::answering(" unclear ")).interpret("hmm", QUESTION), Classification::Unclear);
    }

    #[test]
    fn llm_failure_is_unclear() {
        let llm = CountingLlm::failing();
        assert_eq!(interpreter(&llm).interpret("hmm", QUESTION), Classification::Unclear);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_speech_never_reaches_llm() {
        let llm = CountingLlm::answering("yes");
        assert_eq!(interpreter(&llm).interpret("  ...  ", QUESTION), Classification::Unclear);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn keyword_only_interpreter_is_unclear_on_ambiguity() {
        let interp = SpeechInterpreter::keyword_only();
        assert!(!interp.has_llm());
        assert_eq!(interp.interpret("hmm, I think so maybe", QUESTION), Classification::Unclear);
    }
}
