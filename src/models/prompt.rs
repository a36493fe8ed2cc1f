#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedPrompt {
    pub key: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

/// Prompt created by an admin and shared by every user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalPrompt {
    pub id: i64,
    pub name: String,
    pub prompt: String,
}

pub const DEFAULT_PROMPT_KEY: &str = "default";

pub const PREDEFINED_PROMPTS: &[PredefinedPrompt] = &[
    PredefinedPrompt {
        key: DEFAULT_PROMPT_KEY,
        name: "Default Assistant",
        prompt: "You are a helpful AI assistant running on a Telegram bot.",
    },
    PredefinedPrompt {
        key: "code",
        name: "Code Assistant",
        prompt: "You are an expert AI programmer. You only write code, no explanations.",
    },
];

impl PredefinedPrompt {
    pub fn find(key: &str) -> Option<&'static PredefinedPrompt> {
        PREDEFINED_PROMPTS.iter().find(|p| p.key == key)
    }

    pub fn default_prompt() -> &'static PredefinedPrompt {
        &PREDEFINED_PROMPTS[0]
    }
}
