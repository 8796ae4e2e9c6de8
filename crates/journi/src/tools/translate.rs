use journi_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};

use super::title_case;

const LANGUAGES: [&str; 10] = [
    "spanish",
    "french",
    "italian",
    "german",
    "japanese",
    "mandarin",
    "arabic",
    "russian",
    "portuguese",
    "thai",
];

/// `(text, pronunciation)` per phrase, in [`LANGUAGES`] order.
type Translations = [(&'static str, &'static str); 10];

const PHRASES: &[(&str, Translations)] = &[
    (
        "hello",
        [
            ("Hola", "oh-lah"),
            ("Bonjour", "bohn-zhoor"),
            ("Ciao", "chow"),
            ("Hallo", "hah-loh"),
            ("こんにちは (Konnichiwa)", "kohn-nee-chee-wah"),
            ("你好 (Nǐ hǎo)", "nee how"),
            ("مرحبا (Marhaba)", "mar-ha-ba"),
            ("Здравствуйте (Zdravstvuyte)", "zdrah-stvooy-tye"),
            ("Olá", "oh-lah"),
            ("สวัสดี (Sawatdee)", "sa-wat-dee"),
        ],
    ),
    (
        "thank you",
        [
            ("Gracias", "grah-see-ahs"),
            ("Merci", "mair-see"),
            ("Grazie", "graht-see-eh"),
            ("Danke", "dahn-kuh"),
            ("ありがとう (Arigatou)", "ah-ree-gah-toh"),
            ("谢谢 (Xièxiè)", "shyeh-shyeh"),
            ("شكرا (Shukran)", "shoo-kran"),
            ("Спасибо (Spasibo)", "spah-see-bah"),
            ("Obrigado / Obrigada", "oh-bree-gah-doo / oh-bree-gah-dah"),
            ("ขอบคุณ (Khop khun)", "kop-koon"),
        ],
    ),
    (
        "please",
        [
            ("Por favor", "por fah-vor"),
            ("S'il vous plaît", "seel voo pleh"),
            ("Per favore", "pehr fah-voh-reh"),
            ("Bitte", "bit-tuh"),
            ("お願いします (Onegaishimasu)", "oh-neh-guy-shee-mahs"),
            ("请 (Qǐng)", "ching"),
            ("من فضلك (Min fadlak)", "min fad-lak"),
            ("Пожалуйста (Pozhaluysta)", "pah-zhal-stah"),
            ("Por favor", "por fah-vor"),
            ("กรุณา (Karuna)", "ka-ru-na"),
        ],
    ),
    (
        "goodbye",
        [
            ("Adiós", "ah-dee-ohs"),
            ("Au revoir", "oh ruh-vwahr"),
            ("Arrivederci", "ah-ree-veh-dehr-chee"),
            ("Auf Wiedersehen", "owf vee-der-zay-en"),
            ("さようなら (Sayounara)", "sah-yoh-nah-rah"),
            ("再见 (Zàijiàn)", "dzai-jyen"),
            ("مع السلامة (Ma'a as-salama)", "ma-ah sa-la-ma"),
            ("До свидания (Do svidaniya)", "dah svee-dah-nee-yah"),
            ("Tchau", "chow"),
            ("ลาก่อน (La kon)", "lah-gon"),
        ],
    ),
    (
        "excuse me",
        [
            ("Disculpe", "dees-kool-peh"),
            ("Excusez-moi", "ex-kew-zay mwah"),
            ("Mi scusi", "mee skoo-zee"),
            ("Entschuldigung", "ent-shool-dee-goong"),
            ("すみません (Sumimasen)", "soo-mee-mah-sen"),
            ("不好意思 (Bù hǎo yìsi)", "boo how ee-suh"),
            ("عفوا (Afwan)", "af-wan"),
            ("Извините (Izvinite)", "eez-vee-nee-tye"),
            ("Com licença", "kohm lee-sen-sah"),
            ("ขอโทษ (Kho thot)", "kor-toht"),
        ],
    ),
    (
        "yes",
        [
            ("Sí", "see"),
            ("Oui", "wee"),
            ("Sì", "see"),
            ("Ja", "yah"),
            ("はい (Hai)", "hai"),
            ("是 (Shì)", "shir"),
            ("نعم (Na'am)", "na-am"),
            ("Да (Da)", "dah"),
            ("Sim", "seeng"),
            ("ใช่ (Chai)", "chai"),
        ],
    ),
    (
        "no",
        [
            ("No", "noh"),
            ("Non", "nohn"),
            ("No", "noh"),
            ("Nein", "nine"),
            ("いいえ (Iie)", "ee-eh"),
            ("不是 (Bù shì)", "boo shir"),
            ("لا (La)", "lah"),
            ("Нет (Net)", "nyet"),
            ("Não", "nowng"),
            ("ไม่ (Mai)", "my"),
        ],
    ),
    (
        "where is the bathroom",
        [
            ("¿Dónde está el baño?", "dohn-deh eh-stah el bahn-yoh"),
            ("Où sont les toilettes ?", "oo sohn lay twah-let"),
            ("Dov'è il bagno?", "doh-veh eel bahn-yoh"),
            ("Wo ist die Toilette?", "voh ist dee toy-let-uh"),
            (
                "トイレはどこですか (Toire wa doko desu ka)",
                "toy-reh wah doh-koh dess kah",
            ),
            (
                "洗手间在哪里？(Xǐshǒujiān zài nǎlǐ?)",
                "shee-show-jyen dzai nah-lee",
            ),
            ("أين الحمام؟ (Ayna al-hammam?)", "eye-na al-ham-mam"),
            ("Где туалет? (Gde tualet?)", "gdyeh too-ah-lyet"),
            ("Onde fica o banheiro?", "ohn-jee fee-kah oo bah-nyay-roo"),
            (
                "ห้องน้ำอยู่ที่ไหน (Hong nam yoo tee nai)",
                "hong nahm yoo tee nai",
            ),
        ],
    ),
];

const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("chinese", "mandarin"),
    ("mandarin chinese", "mandarin"),
    ("china", "mandarin"),
    ("japan", "japanese"),
    ("nihongo", "japanese"),
    ("spain", "spanish"),
    ("espanol", "spanish"),
    ("español", "spanish"),
    ("castilian", "spanish"),
    ("france", "french"),
    ("francais", "french"),
    ("français", "french"),
    ("italy", "italian"),
    ("italiano", "italian"),
    ("germany", "german"),
    ("deutsch", "german"),
    ("brazilian portuguese", "portuguese"),
    ("brazil", "portuguese"),
    ("portugal", "portuguese"),
    ("portugues", "portuguese"),
    ("português", "portuguese"),
    ("russia", "russian"),
    ("thailand", "thai"),
];

/// Target codes understood by Google Cloud Translation.
const GOOGLE_CODES: &[(&str, &str)] = &[
    ("spanish", "es"),
    ("french", "fr"),
    ("italian", "it"),
    ("german", "de"),
    ("japanese", "ja"),
    ("mandarin", "zh-CN"),
    ("arabic", "ar"),
    ("russian", "ru"),
    ("portuguese", "pt"),
    ("thai", "th"),
    ("korean", "ko"),
    ("vietnamese", "vi"),
    ("greek", "el"),
    ("turkish", "tr"),
    ("dutch", "nl"),
    ("hindi", "hi"),
    ("indonesian", "id"),
];

#[derive(Deserialize, JsonSchema)]
pub struct TranslatePhraseParameters {
    #[schemars(
        description = "Text to translate (e.g., \"Hello\", \"Thank you\", \"Where is the bathroom?\")."
    )]
    text: String,
    #[schemars(
        description = "Target language (e.g., \"Spanish\", \"Japanese\", \"French\")."
    )]
    language: String,
}

/// Translates common travel phrases to a local language.
pub struct TranslatePhraseTool {
    live: Option<(Client, String)>,
    parameter_schema: Value,
}

impl TranslatePhraseTool {
    /// Creates a tool answering from the phrase table.
    #[inline]
    pub fn new() -> Self {
        TranslatePhraseTool {
            live: None,
            parameter_schema: schema_for!(TranslatePhraseParameters)
                .to_value(),
        }
    }

    /// Uses Google Cloud Translation for phrases missing from the table.
    pub fn with_api_key(mut self, client: Client, api_key: String) -> Self {
        self.live = Some((client, api_key));
        self
    }
}

impl Default for TranslatePhraseTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for TranslatePhraseTool {
    type Input = TranslatePhraseParameters;

    fn name(&self) -> &str {
        "translate_phrase"
    }

    fn description(&self) -> &str {
        "Translates common travel phrases to a local language, with a \
         pronunciation guide."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: TranslatePhraseParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let live = self.live.clone();
        async move {
            let text = input.text.trim();
            if text.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`text` must not be empty"));
            }
            let language = normalize_language(&input.language);
            let display_language = title_case(&language);

            if let Some((translation, pronunciation)) =
                lookup(&normalize(text), &language)
            {
                return Ok(format!(
                    "🗣️ \"{text}\" in {display_language}:\n\n{translation}\
                     \n\nPronunciation: {pronunciation}"
                ));
            }

            let target = GOOGLE_CODES
                .iter()
                .find(|(name, _)| *name == language)
                .map(|(_, code)| *code);
            if let (Some((client, api_key)), Some(target)) = (live, target) {
                match translate_live(&client, &api_key, text, target).await {
                    Ok(Some(translation)) => {
                        return Ok(format!(
                            "🗣️ \"{text}\" in {display_language}:\n\n\
                             {translation}\n\n\
                             (Translated with Google Cloud Translation)"
                        ));
                    }
                    Ok(None) => debug!("empty translation for {text:?}"),
                    Err(err) => warn!("translation API failed: {err}"),
                }
            }

            Ok(miss_message(text, &language))
        }
    }
}

/// Lowercases and drops surrounding whitespace and punctuation.
fn normalize(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || "¿¡".contains(c))
        .trim()
        .to_lowercase()
}

fn normalize_language(language: &str) -> String {
    let language = normalize(language);
    LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == language)
        .map_or(language, |(_, name)| (*name).to_owned())
}

fn lookup(phrase: &str, language: &str) -> Option<(&'static str, &'static str)> {
    let column = LANGUAGES.iter().position(|l| *l == language)?;
    let exact = PHRASES.iter().find(|(key, _)| *key == phrase);
    let (_, translations) = exact.or_else(|| {
        PHRASES.iter().find(|(key, _)| {
            key.len() >= 4
                && (phrase.contains(key)
                    || (phrase.len() >= 4 && key.contains(phrase)))
        })
    })?;
    Some(translations[column])
}

fn miss_message(text: &str, language: &str) -> String {
    let display_language = title_case(language);
    if LANGUAGES.contains(&language) {
        let known: Vec<_> = PHRASES.iter().map(|(key, _)| *key).collect();
        format!(
            "I don't have a translation for \"{text}\" in {display_language}. \
             Phrases I can translate to {display_language}: {}.",
            known.join(", ")
        )
    } else {
        let known: Vec<_> = LANGUAGES.iter().map(|l| title_case(l)).collect();
        format!(
            "I don't have translations for {display_language} yet. \
             Languages I know: {}.",
            known.join(", ")
        )
    }
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

async fn translate_live(
    client: &Client,
    api_key: &str,
    text: &str,
    target: &str,
) -> Result<Option<String>, reqwest::Error> {
    let resp: TranslateResponse = client
        .post(format!(
            "https://translation.googleapis.com/language/translate/v2?key={}",
            urlencoding::encode(api_key)
        ))
        .json(&json!({ "q": text, "target": target, "format": "text" }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(resp
        .data
        .translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .filter(|t| !t.is_empty()))
}
