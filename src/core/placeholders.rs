use crate::utils::error::{Result, SiteError};
use regex::{NoExpand, Regex};
use std::collections::HashMap;

// 模板中使用的固定欄位名
pub const KEY_ABOUT: &str = "ABOUT";
pub const KEY_FOOTER: &str = "FOOTER";
pub const KEY_PHONE: &str = "PHONE";
pub const KEY_EMAIL: &str = "EMAIL";
pub const KEY_WHATSAPP: &str = "WHATSAPP";
pub const KEY_WHATSAPP_PHONE: &str = "WHATSAPP_PHONE";
pub const KEY_WHATSAPP_LINK: &str = "WHATSAPP_LINK";

const WHATSAPP_COUNTRY_CODE: &str = "55";

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// WHATSAPP 欄位不直接輸出號碼，改寫成可點擊的 wa.me 深層連結。
pub fn whatsapp_link(phone: &str) -> String {
    format!(
        "https://wa.me/{}{}?text=Ol%C3%A1,%20tudo%20bem?",
        WHATSAPP_COUNTRY_CODE,
        digits_only(phone)
    )
}

// WHATSAPP_PHONE 衍生出 WHATSAPP_LINK，號碼已含國碼。
fn derived_whatsapp_link(phone: &str) -> String {
    format!(
        "https://wa.me/{}?text=Ol%C3%A1%2C%20tudo%20bem%3F",
        digits_only(phone)
    )
}

/// 對自由文本做盡力而為的正規化：電話樣式的片段換成標準電話、
/// Email 樣式的片段換成標準 Email、換行轉成 `<br>`。
/// 這是啟發式的文字處理，不是嚴格解析器，沒有匹配也沒關係。
pub fn normalize_contact_text(text: &str, phone: Option<&str>, email: Option<&str>) -> String {
    let phone_re = Regex::new(r"\(?\d{2}\)?[\s-]?\d{4,5}[\s-]?\d{4}").unwrap();
    let email_re = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();

    let mut result = text.to_string();
    if let Some(phone) = phone {
        result = phone_re.replace_all(&result, NoExpand(phone)).to_string();
    }
    if let Some(email) = email {
        result = email_re.replace_all(&result, NoExpand(email)).to_string();
    }

    result
        .replace("\r\n", "<br>")
        .replace('\r', "<br>")
        .replace('\n', "<br>")
}

/// 在替換佔位符之前先處理特殊欄位：WhatsApp 連結改寫、
/// ABOUT / FOOTER 的聯絡資訊正規化。
pub fn prepare_values(config: &HashMap<String, String>) -> HashMap<String, String> {
    let mut values = config.clone();

    if let Some(number) = values.get(KEY_WHATSAPP).cloned() {
        let link = whatsapp_link(&number);
        tracing::debug!("🔄 WHATSAPP rewritten to deep link: {}", link);
        values.insert(KEY_WHATSAPP.to_string(), link);
    }

    if let Some(number) = values.get(KEY_WHATSAPP_PHONE).cloned() {
        values.insert(KEY_WHATSAPP_LINK.to_string(), derived_whatsapp_link(&number));
    }

    let phone = values.get(KEY_PHONE).cloned();
    let email = values.get(KEY_EMAIL).cloned();
    for key in [KEY_ABOUT, KEY_FOOTER] {
        if let Some(text) = values.get(key).cloned() {
            let normalized = normalize_contact_text(&text, phone.as_deref(), email.as_deref());
            values.insert(key.to_string(), normalized);
        }
    }

    values
}

/// 佔位符替換：每個 key 同時替換 `{{KEY}}` 與裸露的 `KEY`，
/// 最後清掉沒有值的 `{{...}}`。所有替換都作用在「原始」文本的匹配上，
/// 不會對別的 key 替換出來的值再做二次替換。
pub fn substitute(text: &str, values: &HashMap<String, String>) -> Result<String> {
    let replaced = if values.is_empty() {
        text.to_string()
    } else {
        // 長 key 排前面，避免短 key 吃掉長 key 的前綴
        let mut keys: Vec<&str> = values
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !k.is_empty())
            .collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let alternation = keys
            .iter()
            .map(|k| {
                let escaped = regex::escape(k);
                format!(r"\{{\{{{}\}}\}}|{}", escaped, escaped)
            })
            .collect::<Vec<_>>()
            .join("|");

        let re = Regex::new(&alternation).map_err(|e| SiteError::ValidationError {
            message: format!("Invalid placeholder key set: {}", e),
        })?;

        re.replace_all(text, |caps: &regex::Captures| {
            let matched = &caps[0];
            let key = matched
                .strip_prefix("{{")
                .and_then(|s| s.strip_suffix("}}"))
                .unwrap_or(matched);
            values.get(key).cloned().unwrap_or_default()
        })
        .to_string()
    };

    // 清除沒有提供值的佔位符
    let leftover = Regex::new(r"\{\{[^}]+\}\}").unwrap();
    Ok(leftover.replace_all(&replaced, "").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_curly_and_bare_tokens() {
        let values = map(&[("NAME", "Clinica Silva")]);
        let out = substitute("<h1>{{NAME}}</h1><p>NAME</p>", &values).unwrap();
        assert_eq!(out, "<h1>Clinica Silva</h1><p>Clinica Silva</p>");
    }

    #[test]
    fn test_substitute_strips_unfilled_tokens() {
        let values = map(&[("NAME", "X")]);
        let out = substitute("{{NAME}} {{MISSING}} end", &values).unwrap();
        assert_eq!(out, "X  end");
    }

    #[test]
    fn test_substitute_is_not_cascading() {
        // The value of A contains the name of key B; B must not be
        // re-substituted inside A's replacement.
        let values = map(&[("A", "value with B inside"), ("B", "boom")]);
        let out = substitute("{{A}}", &values).unwrap();
        assert_eq!(out, "value with B inside");
    }

    #[test]
    fn test_substitute_longest_key_wins() {
        let values = map(&[("FOO", "short"), ("FOOBAR", "long")]);
        let out = substitute("FOOBAR and FOO", &values).unwrap();
        assert_eq!(out, "long and short");
    }

    #[test]
    fn test_substitute_empty_map_only_strips() {
        let out = substitute("a {{X}} b", &HashMap::new()).unwrap();
        assert_eq!(out, "a  b");
    }

    #[test]
    fn test_whatsapp_key_becomes_deep_link() {
        let values = prepare_values(&map(&[("WHATSAPP", "(31) 99999-8888")]));
        assert_eq!(
            values.get("WHATSAPP").unwrap(),
            "https://wa.me/5531999998888?text=Ol%C3%A1,%20tudo%20bem?"
        );
    }

    #[test]
    fn test_whatsapp_phone_derives_link() {
        let values = prepare_values(&map(&[("WHATSAPP_PHONE", "5531 99999-8888")]));
        assert_eq!(
            values.get("WHATSAPP_LINK").unwrap(),
            "https://wa.me/5531999998888?text=Ol%C3%A1%2C%20tudo%20bem%3F"
        );
    }

    #[test]
    fn test_about_normalization_rewrites_phone_and_email() {
        let values = prepare_values(&map(&[
            ("PHONE", "(11) 5555-0000"),
            ("EMAIL", "contact@clinic.com"),
            ("ABOUT", "Call (31) 98888-7777 or write old@mail.com\ntoday"),
        ]));
        assert_eq!(
            values.get("ABOUT").unwrap(),
            "Call (11) 5555-0000 or write contact@clinic.com<br>today"
        );
    }

    #[test]
    fn test_footer_newlines_become_breaks_without_contacts() {
        let values = prepare_values(&map(&[("FOOTER", "line one\r\nline two")]));
        assert_eq!(values.get("FOOTER").unwrap(), "line one<br>line two");
    }

    #[test]
    fn test_normalization_tolerates_text_without_matches() {
        let out = normalize_contact_text("nothing to rewrite here", Some("(11) 5555-0000"), None);
        assert_eq!(out, "nothing to rewrite here");
    }
}
