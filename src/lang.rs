//! Question language detection and the answer label derived from it.

use whatlang::Lang;

const ARABIC_LABEL: &str = "إجابة بناءً على المستندات :";
const FRENCH_LABEL: &str = "Réponse basée sur les documents :";
const DEFAULT_LABEL: &str = "Based on the documents:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLanguage {
    Known(Lang),
    Unknown,
}

impl DetectedLanguage {
    /// ISO 639-3 code, or `"unknown"`.
    pub fn code(self) -> &'static str {
        match self {
            DetectedLanguage::Known(lang) => lang.code(),
            DetectedLanguage::Unknown => "unknown",
        }
    }
}

/// Never fails: text without usable evidence is reported as unknown.
pub fn detect_language(text: &str) -> DetectedLanguage {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DetectedLanguage::Unknown;
    }

    match whatlang::detect(trimmed) {
        Some(info) => DetectedLanguage::Known(info.lang()),
        None => DetectedLanguage::Unknown,
    }
}

pub fn answer_label(language: DetectedLanguage) -> &'static str {
    match language {
        DetectedLanguage::Known(Lang::Ara) => ARABIC_LABEL,
        DetectedLanguage::Known(Lang::Fra) => FRENCH_LABEL,
        _ => DEFAULT_LABEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(detect_language("   "), DetectedLanguage::Unknown);
        assert_eq!(detect_language("").code(), "unknown");
    }

    #[test]
    fn symbols_only_is_unknown() {
        assert_eq!(detect_language("1234 ?!"), DetectedLanguage::Unknown);
    }

    #[test]
    fn arabic_question_gets_arabic_label() {
        let lang = detect_language("ما هو الموضوع الرئيسي لهذا المستند وما هي النتائج المهمة؟");
        assert_eq!(lang, DetectedLanguage::Known(Lang::Ara));
        assert_eq!(answer_label(lang), ARABIC_LABEL);
    }

    #[test]
    fn french_question_gets_french_label() {
        let lang = detect_language(
            "Quelle est la conclusion principale de ce document et pourquoi les auteurs la proposent-ils ?",
        );
        assert_eq!(lang, DetectedLanguage::Known(Lang::Fra));
        assert_eq!(answer_label(lang), FRENCH_LABEL);
    }

    #[test]
    fn other_languages_fall_back_to_english_label() {
        let lang = detect_language(
            "What is the main conclusion of this document and why do the authors propose it?",
        );
        assert_eq!(lang.code(), "eng");
        assert_eq!(answer_label(lang), DEFAULT_LABEL);
        assert_eq!(answer_label(DetectedLanguage::Unknown), DEFAULT_LABEL);
    }
}
