//! UI languages and the strings shown on the page for each of them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UiLanguage {
    #[serde(rename = "français")]
    French,
    #[serde(rename = "english")]
    English,
    #[serde(rename = "arabic")]
    Arabic,
}

impl UiLanguage {
    /// Selector order.
    pub const ALL: [UiLanguage; 3] = [UiLanguage::French, UiLanguage::English, UiLanguage::Arabic];

    pub fn label(self) -> &'static str {
        match self {
            UiLanguage::French => "français",
            UiLanguage::English => "english",
            UiLanguage::Arabic => "arabic",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            UiLanguage::French => "fr",
            UiLanguage::English => "en",
            UiLanguage::Arabic => "ar",
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, UiLanguage::Arabic)
    }

    /// Accepts either the selector label or the two-letter code.
    pub fn parse(value: &str) -> Option<Self> {
        let needle = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.label() == needle || lang.code() == needle)
            .or_else(|| (needle == "francais" || needle == "french").then_some(UiLanguage::French))
    }

    pub fn translations(self) -> &'static Translations {
        match self {
            UiLanguage::French => &FRENCH,
            UiLanguage::English => &ENGLISH,
            UiLanguage::Arabic => &ARABIC,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Translations {
    pub title: &'static str,
    pub language_selector: &'static str,
    pub model_selector: &'static str,
    pub upload_file: &'static str,
    pub ask_question: &'static str,
    pub loading_documents: &'static str,
    pub loading_response: &'static str,
    pub question_placeholder: &'static str,
    pub extraction_started: &'static str,
    pub llm_answer_label: &'static str,
}

static FRENCH: Translations = Translations {
    title: "Système d'Interrogation de Documents avec LLM et Récupération",
    language_selector: "Sélectionnez la langue",
    model_selector: "Sélectionnez le modèle que vous souhaitez utiliser :",
    upload_file: "Téléchargez un document PDF",
    ask_question: "Posez votre question ici :",
    loading_documents: "Extraction des documents...",
    loading_response: "Génération de la réponse...",
    question_placeholder: "Veuillez poser une question.",
    extraction_started: "Extraction en cours en arrière-plan. Posez votre question pendant ce temps.",
    llm_answer_label: "Réponse générée par le LLM :",
};

static ENGLISH: Translations = Translations {
    title: "Document Question Answering with LLM and Retrieval",
    language_selector: "Select the language",
    model_selector: "Select the model you want to use:",
    upload_file: "Upload a PDF document",
    ask_question: "Ask your question here:",
    loading_documents: "Extracting documents...",
    loading_response: "Generating response...",
    question_placeholder: "Please ask a question.",
    extraction_started: "Extraction running in the background. Ask your question in the meantime.",
    llm_answer_label: "Response generated by the LLM:",
};

static ARABIC: Translations = Translations {
    title: "نظام الاستعلام عن المستندات باستخدام نموذج لغوي واسترجاع",
    language_selector: "اختر اللغة",
    model_selector: "اختر النموذج الذي تريد استخدامه:",
    upload_file: "قم بتحميل مستند PDF",
    ask_question: "اطرح سؤالك هنا:",
    loading_documents: "جاري استخراج المستندات...",
    loading_response: "جاري إنشاء الإجابة...",
    question_placeholder: "يرجى طرح سؤال.",
    extraction_started: "جاري الاستخراج في الخلفية. يمكنك طرح سؤالك في هذه الأثناء.",
    llm_answer_label: "إجابة من النموذج اللغوي:",
};
