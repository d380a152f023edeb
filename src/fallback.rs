//! Locally computed substitute responses for failed provider calls.
//!
//! The gateway never surfaces a recoverable provider error to the caller;
//! it degrades to the output produced here, tagged `source: "fallback"` in
//! the response envelope so callers and tests can tell the difference.

use rand::Rng;

/// Canned chat sentences that interpolate the caller's original message.
const CHAT_INTERPOLATED: &[&str] = &[
    "မင်္ဂလာပါ! သင့်ရဲ့စကား: \"{message}\" ကို နားလည်ပါတယ်။ ပိုမိုကူညီနိုင်ရန် ကျေးဇူးပြု၍ ထပ်မံမေးမြန်းပေးပါ။",
    "ကျေးဇူးတင်ပါတယ်! သင့်ရဲ့စကား: \"{message}\" အတွက် ကူညီပေးနိုင်ရန် ကြိုးစားပါမည်။",
    "အကြံဉာဏ်ကောင်းပါပဲ! \"{message}\" ဆိုတဲ့အကြောင်း စဉ်းစားကြည့်ရအောင်...",
    "မင်္ဂလာပါ! Burme Mark AI မှ ကြိုဆိုပါတယ်။ \"{message}\" အတွက် ကူညီပေးနိုင်ပါတယ်။",
    "သင့်ရဲ့စကား: \"{message}\" ကို သိရတာ ဝမ်းသာပါတယ်။ ဘယ်လိုကူညီရမလဲ?",
];

/// Plain canned chat sentences, used when interpolation is disabled.
const CHAT_PLAIN: &[&str] = &[
    "မင်္ဂလာပါ! ကျေးဇူးပြု၍ ထပ်မံမေးမြန်းပေးပါ။",
    "ကျေးဇူးပြု၍ ခဏစောင့်ပါ။ ယခုအချိန်တွင် နည်းပညာဆိုင်ရာ အခက်အခဲများ ရှိနေပါသည်။",
    "ကျေးဇူးတင်ပါတယ်! ကူညီပေးနိုင်ရန် ကြိုးစားပါမည်။",
    "မင်္ဂလာပါ! Burme Mark AI မှ ကြိုဆိုပါတယ်။ ဘယ်လိုကူညီရမလဲ?",
];

const JAVASCRIPT_TEMPLATE: &str = r#"// Generated starter template
function solution(input) {
  // TODO: implement the requested behavior
  if (input === undefined || input === null) {
    throw new Error('Invalid input');
  }
  return input;
}

module.exports = { solution };
"#;

const PYTHON_TEMPLATE: &str = r#"# Generated starter template
def solution(data):
    """Implement the requested behavior here."""
    if data is None:
        raise ValueError("Invalid input")
    return data


if __name__ == "__main__":
    print(solution("example"))
"#;

const HTML_TEMPLATE: &str = r#"<!-- Generated starter template -->
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Starter Page</title>
</head>
<body>
    <main>
        <h1>Hello</h1>
        <p>Replace this with your content.</p>
    </main>
</body>
</html>
"#;

const CSS_TEMPLATE: &str = r#"/* Generated starter template */
:root {
    --primary-color: #0088cc;
}

body {
    font-family: Arial, sans-serif;
    margin: 0;
    line-height: 1.6;
}

.container {
    max-width: 960px;
    margin: 0 auto;
    padding: 20px;
}
"#;

/// The language the code fallback resolves to when the request names none,
/// or names one we have no template for.
pub const DEFAULT_CODE_LANGUAGE: &str = "javascript";

/// Produces substitute responses with no external dependency.
pub struct FallbackGenerator {
    /// Whether chat fallbacks interpolate the caller's original message.
    interpolate_chat: bool,
}

impl FallbackGenerator {
    pub fn new(interpolate_chat: bool) -> Self {
        Self { interpolate_chat }
    }

    /// Pick a canned chat sentence, uniformly at random over the set.
    pub fn chat_reply(&self, message: &str) -> String {
        let mut rng = rand::thread_rng();
        if self.interpolate_chat {
            let template = CHAT_INTERPOLATED[rng.gen_range(0..CHAT_INTERPOLATED.len())];
            template.replace("{message}", message)
        } else {
            CHAT_PLAIN[rng.gen_range(0..CHAT_PLAIN.len())].to_string()
        }
    }

    /// Deterministic placeholder image reference encoding the prompt.
    /// No network call is made; the URL points at a public placeholder host.
    pub fn image_placeholder(&self, prompt: &str) -> String {
        let text: String = prompt.chars().take(50).collect();
        format!(
            "https://placehold.co/512x512/0088cc/white?text={}",
            urlencoding::encode(&text)
        )
    }

    /// Skeletal code template keyed by language.
    ///
    /// Returns the template and the language it is actually written in
    /// (unknown languages resolve to the javascript default).
    pub fn code_template(&self, language: &str) -> (&'static str, &'static str) {
        match language.trim().to_lowercase().as_str() {
            "python" | "py" => (PYTHON_TEMPLATE, "python"),
            "html" => (HTML_TEMPLATE, "html"),
            "css" => (CSS_TEMPLATE, "css"),
            "javascript" | "js" => (JAVASCRIPT_TEMPLATE, "javascript"),
            _ => (JAVASCRIPT_TEMPLATE, DEFAULT_CODE_LANGUAGE),
        }
    }
}
