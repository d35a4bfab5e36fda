use serde::Deserialize;
use serde_json::json;

use super::{one_of, required_text, ToolOutput, ToolSpec};
use crate::error::{LibrarySearchError, Result};

pub const NAME: &str = "text_processor";

const MAX_TEXT_CHARS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperation {
    Uppercase,
    Lowercase,
    Reverse,
    WordCount,
    CharCount,
    TitleCase,
}

impl TextOperation {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "uppercase" => Some(TextOperation::Uppercase),
            "lowercase" => Some(TextOperation::Lowercase),
            "reverse" => Some(TextOperation::Reverse),
            "word_count" => Some(TextOperation::WordCount),
            "char_count" => Some(TextOperation::CharCount),
            "title_case" => Some(TextOperation::TitleCase),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            TextOperation::Uppercase => "uppercase",
            TextOperation::Lowercase => "lowercase",
            TextOperation::Reverse => "reverse",
            TextOperation::WordCount => "word_count",
            TextOperation::CharCount => "char_count",
            TextOperation::TitleCase => "title_case",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextProcessorArgs {
    pub text: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextJob {
    pub text: String,
    pub operation: TextOperation,
}

impl TextProcessorArgs {
    pub fn validate(self) -> Result<TextJob> {
        let text = required_text(
            self.text,
            MAX_TEXT_CHARS,
            "You must provide text to process.",
            "The text cannot be longer than 10,000 characters.",
        )?;
        let operation = self.operation.ok_or_else(|| {
            LibrarySearchError::Validation("You must specify an operation.".into())
        })?;
        let operation = one_of(
            Some(operation.as_str()),
            TextOperation::from_name,
            TextOperation::Uppercase,
            "Operation must be one of: uppercase, lowercase, reverse, word_count, char_count, or title_case.",
        )?;
        Ok(TextJob { text, operation })
    }
}

/// Words are runs of letters, apostrophes and hyphens.
fn word_count(text: &str) -> usize {
    text.split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '-'))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count()
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

pub fn run(job: TextJob) -> ToolOutput {
    let TextJob { text, operation } = job;
    let processed = match operation {
        TextOperation::WordCount => {
            return ToolOutput::text(format!("Text analysis result: {} words", word_count(&text)))
        }
        TextOperation::CharCount => {
            return ToolOutput::text(format!(
                "Text analysis result: {} characters",
                text.chars().count()
            ))
        }
        TextOperation::Uppercase => text.to_uppercase(),
        TextOperation::Lowercase => text.to_lowercase(),
        TextOperation::Reverse => text.chars().rev().collect(),
        TextOperation::TitleCase => title_case(&text),
    };
    ToolOutput::text(format!(
        "Processed text ({}):\n\n{processed}",
        operation.as_str()
    ))
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Processes text with various operations like uppercase, lowercase, reverse, word count, and character count.",
        input_schema: json!({
            "type": "object",
            "required": ["text", "operation"],
            "properties": {
                "text": { "type": "string", "description": "The text to process." },
                "operation": {
                    "type": "string",
                    "enum": ["uppercase", "lowercase", "reverse", "word_count", "char_count", "title_case"],
                    "description": "The text processing operation to perform."
                }
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(text: &str, op: &str) -> Result<ToolOutput> {
        TextProcessorArgs {
            text: Some(text.into()),
            operation: Some(op.into()),
        }
        .validate()
        .map(run)
    }

    #[test]
    fn counts() {
        assert_eq!(
            process("Hello world, it's me", "word_count").unwrap().content,
            vec!["Text analysis result: 4 words"]
        );
        assert_eq!(
            process("héllo", "char_count").unwrap().content,
            vec!["Text analysis result: 5 characters"]
        );
    }

    #[test]
    fn transforms() {
        assert_eq!(
            process("hello WORLD", "title_case").unwrap().content,
            vec!["Processed text (title_case):\n\nHello World"]
        );
        assert_eq!(
            process("abc", "reverse").unwrap().content,
            vec!["Processed text (reverse):\n\ncba"]
        );
        assert_eq!(
            process("Mixed", "uppercase").unwrap().content,
            vec!["Processed text (uppercase):\n\nMIXED"]
        );
    }

    #[test]
    fn rejects_long_text_and_bad_operation() {
        let long = "a".repeat(10_001);
        assert_eq!(
            process(&long, "reverse").unwrap_err().to_string(),
            "The text cannot be longer than 10,000 characters."
        );
        assert!(process("x", "shout")
            .unwrap_err()
            .to_string()
            .starts_with("Operation must be one of"));
        assert!(process(&"a".repeat(10_000), "reverse").is_ok());
    }
}
