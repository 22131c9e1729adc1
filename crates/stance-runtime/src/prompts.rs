//! System prompts and user-prompt templates for stance detection.
//!
//! Every template ends with or embeds the `STANCE:` / `Reasoning:` answer
//! format that [`stance_core::StanceParser`] expects.

/// Target used when the caller supplies none.
pub const DEFAULT_TARGET: &str = "the mentioned topic";

const NO_TEXT: &str = "[No text provided]";
const EMPTY_TEXT: &str = "[Empty text]";

/// Maximum target length kept by [`clean_inputs`].
pub const MAX_TARGET_CHARS: usize = 200;

/// Maximum text length kept by [`clean_inputs`].
pub const MAX_TEXT_CHARS: usize = 5000;

/// Full SemEval-2016 style system prompt with category definitions and examples.
pub const STANCE_DETECTION_SYSTEM_PROMPT: &str = r#"You are a professional stance detection system trained to analyze text and determine the author's stance towards a specific target according to SemEval 2016 stance detection standards.

Your task is to classify the stance expressed in the given text toward the specified target into one of these three categories:

**FAVOR**: The text expresses support, agreement, positive sentiment, or endorsement toward the target. This includes:
- Direct expressions of support or approval
- Positive evaluations or praise
- Advocacy for the target
- Benefits or advantages mentioned about the target

**AGAINST**: The text expresses opposition, disagreement, negative sentiment, or criticism toward the target. This includes:
- Direct expressions of opposition or disapproval
- Negative evaluations or criticism
- Arguments against the target
- Problems or disadvantages mentioned about the target

**NONE**: The text does not express a clear stance toward the target, or the text is neutral, unrelated, or provides insufficient information to determine stance. This includes:
- Neutral, factual statements without opinion
- Text unrelated to the target
- Ambiguous statements that could be interpreted either way
- Questions without clear position indicators
- Purely informational content

**IMPORTANT GUIDELINES:**

1. Focus on the author's explicit or implicit position toward the TARGET, not general sentiment
2. Consider both direct statements and implied attitudes
3. If the stance is unclear or ambiguous, choose NONE rather than guessing
4. Look for stance indicators like evaluative language, emotional expressions, and argumentative patterns
5. The target must be specifically addressed or clearly implied in the text
6. Consider the overall context and implied meaning, not just individual words

**OUTPUT FORMAT:**
You must respond with exactly this format:

STANCE: [FAVOR/AGAINST/NONE]
Reasoning: [Provide a clear, concise explanation of your decision, referencing specific textual evidence]

**EXAMPLES:**

Target: Donald Trump
Text: "Trump's economic policies have created millions of jobs and strengthened our economy tremendously!"
STANCE: FAVOR
Reasoning: The text expresses clear support for Trump's policies by highlighting positive outcomes (job creation, economic strengthening) with enthusiastic language.

Target: Hillary Clinton
Text: "Clinton's email scandal demonstrates a serious lack of judgment and trustworthiness that disqualifies her from office."
STANCE: AGAINST
Reasoning: The text criticizes Clinton by citing the email issue as evidence of poor judgment and explicitly states she should be disqualified from office.

Target: Climate Change
Text: "The weather forecast shows it will be sunny tomorrow with temperatures reaching 75 degrees."
STANCE: NONE
Reasoning: While the text mentions weather, it does not express any position toward climate change as a policy issue or scientific concept.

Target: Healthcare Reform
Text: "Both the current system and the proposed reforms have advantages and disadvantages that need careful consideration."
STANCE: NONE
Reasoning: The text presents a neutral, balanced view without taking a clear position in favor of or against healthcare reform.

Target: Gun Control
Text: "Stricter gun laws will help reduce violence and make our communities safer for families and children."
STANCE: FAVOR
Reasoning: The text argues that gun control measures will have positive outcomes (reduced violence, safer communities), expressing clear support for stricter gun laws.

Remember: Always provide your classification first, followed by clear reasoning based on textual evidence. Be precise and consistent with the SemEval 2016 standards."#;

/// Short system prompt for small-context models.
pub const STANCE_DETECTION_BRIEF_PROMPT: &str = r#"You are a stance detection system. Analyze the text and determine if the author's stance toward the target is FAVOR (supportive), AGAINST (opposed), or NONE (neutral/unrelated).

Respond in this exact format:
STANCE: [FAVOR/AGAINST/NONE]
Reasoning: [Brief explanation]

Focus on the author's position toward the specific target mentioned."#;

/// System prompt for non-English input; answers stay in English.
pub const MULTILINGUAL_STANCE_PROMPT: &str = r#"You are a multilingual stance detection system. Analyze the text in any language and determine the stance toward the target according to SemEval 2016 standards.

Categories:
- FAVOR: Support, agreement, positive sentiment toward target
- AGAINST: Opposition, disagreement, negative sentiment toward target
- NONE: Neutral, unrelated, or insufficient information

Respond in English using this format:
STANCE: [FAVOR/AGAINST/NONE]
Reasoning: [Explanation in English]

Consider cultural and linguistic nuances while maintaining consistent classification standards."#;

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Basic stance prompt for one text and one target.
pub fn stance_prompt(target: &str, text: &str) -> String {
    format!(
        "Target: {}\nText: \"{}\"\n\nAnalyze the stance expressed in this text toward the target and classify it according to the guidelines above.",
        or_default(target, DEFAULT_TARGET),
        or_default(text, NO_TEXT)
    )
}

/// Stance prompt preceded by background context, if any.
pub fn contextual_prompt(target: &str, text: &str, context: Option<&str>) -> String {
    let base = stance_prompt(target, text);
    match context.filter(|c| !c.trim().is_empty()) {
        Some(context) => format!(
            "Context: {}\n\n{}\n\nConsider the provided context when analyzing the stance.",
            context, base
        ),
        None => base,
    }
}

fn domain_guideline(domain: &str) -> String {
    let guideline = match domain.to_lowercase().as_str() {
        "political" => "Consider political rhetoric, policy positions, and partisan language patterns.",
        "healthcare" => "Focus on medical policy, treatment approaches, and healthcare system perspectives.",
        "technology" => "Consider technological adoption, innovation impacts, and digital transformation views.",
        "environmental" => "Analyze environmental policy, sustainability practices, and climate-related positions.",
        "economic" => "Focus on economic policies, market perspectives, and financial implications.",
        "social" => "Consider social issues, cultural perspectives, and community impact views.",
        _ => return format!("Consider {}-specific perspectives and terminology.", domain),
    };
    guideline.to_string()
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stance prompt with domain-specific guidance.
pub fn domain_prompt(target: &str, text: &str, domain: &str) -> String {
    format!(
        "Domain: {}\n{}\n\n{}\n\nApply domain-specific understanding while maintaining consistent stance classification standards.",
        title_case(domain),
        domain_guideline(domain),
        stance_prompt(target, text)
    )
}

/// Stance prompt that also asks for a confidence level.
pub fn confidence_prompt(target: &str, text: &str) -> String {
    format!(
        "{}\n\nAdditionally, provide a confidence level for your classification:\nConfidence: [High/Medium/Low]\n\nHigh: Clear, unambiguous stance with strong textual evidence\nMedium: Reasonably clear stance with adequate evidence\nLow: Uncertain or ambiguous stance with limited evidence",
        stance_prompt(target, text)
    )
}

/// Stance prompt asking for a detailed, evidence-citing explanation.
pub fn explanation_prompt(target: &str, text: &str) -> String {
    format!(
        "{}\n\nProvide a detailed analysis including:\n1. Key phrases or words that indicate stance\n2. Implicit meanings or implications\n3. Overall context and tone\n4. Any ambiguities or conflicting signals\n5. Final stance decision with confidence level\n\nBe thorough in your reasoning and cite specific textual evidence.",
        stance_prompt(target, text)
    )
}

/// One target, several texts.
pub fn batch_prompt<S: AsRef<str>>(target: &str, texts: &[S]) -> String {
    let target = or_default(target, DEFAULT_TARGET);
    if texts.is_empty() {
        return format!("Target: {}\nNo texts provided for analysis.", target);
    }

    let mut prompt = format!(
        "Target: {}\n\nAnalyze the stance in each of the following texts:\n\n",
        target
    );
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("Text {}: \"{}\"\n", i + 1, text.as_ref()));
    }
    prompt.push_str("\nProvide stance classification (FAVOR/AGAINST/NONE) and reasoning for each text.");
    prompt
}

/// One text, several targets.
pub fn comparative_prompt<S: AsRef<str>>(targets: &[S], text: &str) -> String {
    let targets = if targets.is_empty() {
        "the mentioned topics".to_string()
    } else {
        targets
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Text: \"{}\"\n\nAnalyze the stance expressed in this text toward each of the following targets: {}\n\nFor each target, provide:\nTarget: [target name]\nSTANCE: [FAVOR/AGAINST/NONE]\nReasoning: [explanation]",
        or_default(text, NO_TEXT),
        targets
    )
}

/// Prompt inputs after trimming, defaulting and truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedInputs {
    pub target: String,
    pub text: String,
    /// `false` when the text was missing or blank and a placeholder was used
    pub is_valid: bool,
}

fn truncate_with_ellipsis(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let mut truncated: String = value.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    } else {
        value.to_string()
    }
}

/// Clean prompt inputs.
///
/// Targets over 200 characters and texts over 5000 are cut and suffixed
/// with `...`.
pub fn clean_inputs(target: Option<&str>, text: Option<&str>) -> CleanedInputs {
    let target = match target.map(str::trim) {
        Some(t) if !t.is_empty() => truncate_with_ellipsis(t, MAX_TARGET_CHARS),
        _ => DEFAULT_TARGET.to_string(),
    };

    let (text, is_valid) = match text {
        None => (NO_TEXT.to_string(), false),
        Some(t) if t.trim().is_empty() => (EMPTY_TEXT.to_string(), false),
        Some(t) => (truncate_with_ellipsis(t.trim(), MAX_TEXT_CHARS), true),
    };

    CleanedInputs {
        target,
        text,
        is_valid,
    }
}
