use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"));
static DAY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^##\s*(day\s*\d+)").expect("valid day heading pattern"));
static SUB_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^###\s+(.*)$").expect("valid sub heading pattern"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^- (.*)$").expect("valid list pattern"));
static KEYWORD_EMOJIS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bhotel\b", "🏨 $0"),
        (r"(?i)\brestaurant\b", "🍽️ $0"),
        (r"(?i)\bfood\b", "🍲 $0"),
        (r"(?i)\btips?\b", "💡 $0"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid keyword pattern"),
            replacement,
        )
    })
    .collect()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub keyword_emojis: bool,
}

pub fn format_reply(text: &str) -> String {
    format_reply_with(text, FormatOptions::default())
}

/// Textual markup pass over a raw reply. Lines without markers pass through
/// untouched; line breaks become `<br>` outside of lists.
pub fn format_reply_with(text: &str, options: FormatOptions) -> String {
    let mut blocks = Vec::new();
    let mut list_items = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(caps) = LIST_ITEM.captures(line) {
            list_items.push(format!("<li>{}</li>", format_inline(&caps[1], options)));
            continue;
        }

        flush_list(&mut blocks, &mut list_items);
        blocks.push(format_line(line, options));
    }
    flush_list(&mut blocks, &mut list_items);

    blocks.join("<br>")
}

fn format_line(line: &str, options: FormatOptions) -> String {
    let line = if DAY_HEADING.is_match(line) {
        DAY_HEADING
            .replace(line, "🌟 <h3>$1</h3>")
            .into_owned()
    } else if SUB_HEADING.is_match(line) {
        SUB_HEADING.replace(line, "📍 <h4>$1</h4>").into_owned()
    } else {
        line.to_string()
    };

    format_inline(&line, options)
}

fn format_inline(text: &str, options: FormatOptions) -> String {
    let mut out = BOLD.replace_all(text, "<strong>$1</strong>").into_owned();
    if options.keyword_emojis {
        for (pattern, replacement) in KEYWORD_EMOJIS.iter() {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }
    }
    out
}

fn flush_list(blocks: &mut Vec<String>, items: &mut Vec<String>) {
    if items.is_empty() {
        return;
    }
    blocks.push(format!("<ul>{}</ul>", items.concat()));
    items.clear();
}
