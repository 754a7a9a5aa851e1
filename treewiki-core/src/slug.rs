//! URL slug generation for page names.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Slug used when a name reduces to nothing
pub const EMPTY_SLUG: &str = "page";

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Remove inline `<tag>` markup, keeping the text between tags
pub fn strip_tags(input: &str) -> String {
    tag_regex().replace_all(input, "").into_owned()
}

/// Convert a display name to a URL-safe slug
///
/// Rules:
/// - Strip inline markup tags
/// - Lowercase
/// - Collapse special glyphs to ASCII (`ŋ` -> `ng`, `á` -> `a`)
/// - Drop spaces and punctuation, keeping hyphens
///
/// # Examples
///
/// ```
/// use treewiki_core::url_form;
///
/// assert_eq!(url_form("Hello World"), "helloworld");
/// assert_eq!(url_form("<i>Ŋaʃi</i>"), "ngashi");
/// assert_eq!(url_form("-ka"), "-ka");
/// ```
pub fn url_form(name: &str) -> String {
    let lowered = strip_tags(name).to_lowercase();

    let slug = lowered
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_ascii_alphanumeric() || c == '-' {
                // Graphemes like "e\u{301}" keep their ASCII base
                Some(c.to_string())
            } else {
                ascii_glyph(c).map(str::to_string)
            }
        })
        .collect::<String>();

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

pub(crate) fn ascii_glyph(c: char) -> Option<&'static str> {
    let out = match c {
        'á' | 'à' | 'â' | 'ä' | 'ā' | 'ã' | 'å' | 'ă' => "a",
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ě' | 'ə' => "e",
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'ɪ' => "i",
        'ó' | 'ò' | 'ô' | 'ö' | 'ō' | 'õ' | 'ø' | 'ɔ' => "o",
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ʊ' => "u",
        'ý' | 'ÿ' | 'ȳ' => "y",
        'ñ' | 'ń' => "n",
        'ç' | 'č' => "c",
        'š' | 'ś' => "s",
        'ž' | 'ź' => "z",
        'ŋ' => "ng",
        'ʃ' => "sh",
        'ʒ' => "zh",
        'θ' | 'þ' => "th",
        'ð' => "dh",
        'χ' => "kh",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'ʔ' => "q",
        _ => return None,
    };
    Some(out)
}
