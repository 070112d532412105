use crate::error::AnalysisError;
use crate::formats::BookAnalysis;

/// Book text beyond this many characters is not sent to the model.
pub const MAX_INPUT_CHARS: usize = 100_000;

pub const MIN_SCENES: usize = 4;
pub const MAX_SCENES: usize = 6;

pub fn build_prompt(text: &str) -> String {
    let text = truncate_chars(text.trim(), MAX_INPUT_CHARS);
    format!(
        "You are a film director adapting a book into a short cinematic trailer.\n\
\n\
Task: Analyze the book text below and break it into {MIN_SCENES} to {MAX_SCENES} key scenes, in narrative order.\n\
\n\
BEGIN_BOOK_TEXT\n\
{text}\n\
END_BOOK_TEXT\n\
\n\
You MUST return:\n\
- `title`, `author` (use \"Unknown\" when the text does not say), `summary` (2-3 sentences).\n\
- `themes`: 3-5 short theme names.\n\
- `scenes`: each with\n\
  - `title`: a short evocative scene title\n\
  - `description`: what happens, 2-3 sentences\n\
  - `foreshadowing`: a subtle hint of what this moment sets up later\n\
  - `visualPrompt`: a detailed, self-contained prompt for image and video generation \
(subject, setting, lighting, camera angle, mood; cinematic, photorealistic; no text or captions)\n\
\n\
Output:\n\
- Output ONLY a single JSON object matching the response schema.\n"
    )
}

/// JSON schema handed to the model as `responseSchema`.
pub fn response_schema() -> serde_json::Value {
    let string = serde_json::json!({ "type": "STRING" });
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": string,
            "author": string,
            "summary": string,
            "themes": { "type": "ARRAY", "items": string },
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": string,
                        "description": string,
                        "foreshadowing": string,
                        "visualPrompt": string,
                    },
                    "required": ["title", "description", "foreshadowing", "visualPrompt"],
                },
            },
        },
        "required": ["title", "author", "summary", "themes", "scenes"],
    })
}

pub fn parse_analysis(raw: &str) -> Result<BookAnalysis, AnalysisError> {
    let json = extract_json_object(raw)?;
    let analysis: BookAnalysis = serde_json::from_str(json)
        .map_err(|err| AnalysisError::InvalidResponse(format!("parse analysis json: {err}")))?;
    validate(&analysis)?;
    Ok(analysis.without_media())
}

pub fn validate(analysis: &BookAnalysis) -> Result<(), AnalysisError> {
    if analysis.title.trim().is_empty() {
        return Err(AnalysisError::InvalidResponse("title is empty".to_owned()));
    }
    if analysis.scenes.is_empty() {
        return Err(AnalysisError::InvalidResponse("no scenes".to_owned()));
    }
    for (idx, scene) in analysis.scenes.iter().enumerate() {
        if scene.visual_prompt.trim().is_empty() {
            return Err(AnalysisError::InvalidResponse(format!(
                "scene {idx} has an empty visualPrompt"
            )));
        }
    }
    Ok(())
}

fn extract_json_object(text: &str) -> Result<&str, AnalysisError> {
    let start = text
        .find('{')
        .ok_or_else(|| AnalysisError::InvalidResponse("missing `{`".to_owned()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AnalysisError::InvalidResponse("missing `}`".to_owned()))?;
    if end <= start {
        return Err(AnalysisError::InvalidResponse(
            "invalid json object span".to_owned(),
        ));
    }
    Ok(&text[start..=end])
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
