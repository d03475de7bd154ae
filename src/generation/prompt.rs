//! Prompt construction and output cleanup

use super::batch::CrawlInputRow;

const MAX_ALT_CHARS: usize = 20;
const MAX_TITLE_CHARS: usize = 10;
const MAX_PAGES_CHARS: usize = 10;

/// Phrases stripped from generated text
pub const UNHELPFUL_PHRASES: &[&str] = &[
    "The image is",
    "This is an image of",
    "The alt text is",
    "file with",
    "a jpg file",
    "a png file",
];

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Prompt asking for WCAG 1.1.1 alternative text for one image
pub fn build_prompt(row: &CrawlInputRow, instructions: &str) -> String {
    let image_url = row.image_url.as_deref().unwrap_or_default();
    let pages = row
        .source_urls
        .as_deref()
        .unwrap_or("No associated pages available");
    let alt_text = row.alt_text.as_deref().unwrap_or("No alt text provided");
    let title = row.title.as_deref().unwrap_or("No title text provided");

    format!(
        "I would like to have alternative text for the image below that complies with WCAG 1.1.1 for accessibility. \
There are good examples of how to do this from the US Government: https://www.section508.gov/create/alternative-text/ \
And also from accessibility experts WebAim: https://webaim.org/techniques/alttext/ \
And also from Harvard University: https://accessibility.huit.harvard.edu/describe-content-images\n\
Describe the image at this URL: {image_url}.\n\
Please review the current alt text and title text provided for the image. \
If they are sufficient and accurate, validate them.\n\
Current alt text: '{alt}'\n\
Current title text: '{title}'\n\
If they are not helpful, generate a concise and accurate alt text that focuses on describing the visual elements of the image. \
The description should focus on the visual content of the image and what information it might add to a page.\n\
Alt text should not include file names, although the filename in the URL may hint at why the author chose the file. \
Alt text should not include suspicious words like: 'image of', 'graphic of', 'picture of', 'photo of', 'placeholder', 'spacer', 'tbd', 'todo', 'to do'. \
Alt text should avoid using meaningless words like 'alt', 'chart', 'decorative', 'image', 'graphic', 'photo', 'placeholder image', 'spacer', 'tbd', 'todo', 'to do', 'undefined'.\n\
Limit reliance on text or context from the following pages: {pages}.\n\
Instructions: {instructions}\n",
        alt = truncate(alt_text, MAX_ALT_CHARS),
        title = truncate(title, MAX_TITLE_CHARS),
        pages = truncate(pages, MAX_PAGES_CHARS),
    )
}

/// Remove filler phrases and surrounding punctuation from generated text
pub fn post_process(generated: &str) -> String {
    let mut text = generated.to_string();
    for phrase in UNHELPFUL_PHRASES {
        text = text.replace(phrase, "").trim().to_string();
    }
    text.trim_matches(|c| c == '.' || c == ' ').to_string()
}
