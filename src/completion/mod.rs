pub mod http;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat-style completion response. Only the parts the merge engine reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl Choice {
    fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }
}

impl CompletionResponse {
    /// Build a response with one choice per given content.
    pub fn from_contents<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let choices = contents
            .into_iter()
            .map(|c| Choice {
                message: Some(ChoiceMessage {
                    content: c.map(Into::into),
                }),
            })
            .collect();
        CompletionResponse { choices }
    }

    /// Content of the first choice whose content is present and non-empty,
    /// scanning choices in order.
    pub fn first_nonempty_content(&self) -> Option<&str> {
        for choice in &self.choices {
            match choice.content() {
                Some(content) if !content.is_empty() => return Some(content),
                _ => continue,
            }
        }
        None
    }

    /// Content of the first choice only, if it is non-empty. Later choices
    /// are never consulted.
    pub fn first_choice_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(Choice::content)
            .filter(|c| !c.is_empty())
    }
}

/// A text-completion service: system instruction plus user content in, a
/// response with zero or more choices out.
///
/// Transport failures and non-success statuses come back as errors; a
/// successful response with no usable content is `Ok` and left to the
/// caller to judge.
pub trait CompletionClient {
    fn complete(&self, system_prompt: &str, user_content: &str) -> Result<CompletionResponse>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for &C {
    fn complete(&self, system_prompt: &str, user_content: &str) -> Result<CompletionResponse> {
        (**self).complete(system_prompt, user_content)
    }
}
