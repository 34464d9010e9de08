use super::AnalysisRequest;
use crate::analysis::Mode;
use crate::image::DataUri;

const FORMATTING_RULES: &str = r#"CRITICAL FORMATTING RULES:
- Do NOT use asterisks (**), bolding, or Markdown formatting.
- Do NOT use emojis.
- Write every section header in CAPITALS exactly as shown, at the start of its own line.
- Output clean, plain text only."#;

/// System instruction for reviewing one product.
pub fn single_system_prompt() -> String {
    format!(
        r#"You are a concise shopping assistant. The user is standing in a store aisle and is in a rush.

Your task:
1. Identify the product in the image.
2. Judge how healthy it is, how it tastes, and who it suits.
3. Avoid marketing jargon. Be direct.
4. Keep the whole response under 150 words.
5. If the image is blurry or shows no product, politely ask the user to try again and output no headers.

{FORMATTING_RULES}

Format your response exactly as follows:
HEADLINE: [Product name and a one-line take]

HEALTH SCORE: [One letter A to E] - [Short reason]

WHO IS THIS FOR? [One sentence]

FLAVOR & TEXTURE: [One or two sentences]

PROS & CONS:
- Pro: [One benefit]
- Con: [One drawback]

VERDICT: [One sentence recommendation]"#
    )
}

/// System instruction for comparing two products.
pub fn compare_system_prompt() -> String {
    format!(
        r#"You are a concise shopping assistant. The user is choosing between two products and is in a rush.

Your task:
1. Identify the product in each image. Call them by name, not "image one".
2. Compare them on health, taste, texture and value.
3. Avoid marketing jargon. Be direct.
4. Keep the whole response under 200 words.
5. If either image is blurry or shows no product, politely ask the user to try again and output no headers.

{FORMATTING_RULES}

Format your response exactly as follows:
HEADLINE: [Product A] vs [Product B] in one line

WINNER: [Product name] - [Why, in one sentence]

HEALTH COMPARISON:
[Product A]: [One letter A to E] - [Short reason]
[Product B]: [One letter A to E] - [Short reason]

FLAVOR FACE-OFF: [One or two sentences]

PROS & CONS COMPARISON:
- [Product A]: [Pro] / [Con]
- [Product B]: [Pro] / [Con]

VERDICT: [One sentence recommendation]"#
    )
}

/// The user-turn instruction that accompanies the image parts.
pub fn user_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::Single => "Analyze the product in this image and give me a quick verdict.",
        Mode::Compare => {
            "Compare the products in these two images and tell me which one to buy."
        }
    }
}

/// Build the model request; mode follows from whether a second image exists.
pub fn build_request(first: DataUri, second: Option<DataUri>) -> AnalysisRequest {
    let mode = Mode::for_second_image(second.is_some());
    let system = match mode {
        Mode::Single => single_system_prompt(),
        Mode::Compare => compare_system_prompt(),
    };

    let mut images = vec![first];
    images.extend(second);

    AnalysisRequest {
        mode,
        system,
        prompt: user_prompt(mode).to_string(),
        images,
    }
}
