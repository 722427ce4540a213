//! Built-in capability table used when a registration does not declare one.

use mr_core::{Capabilities, ProviderKind};

const GEMINI_OUTPUT_TOKENS: u32 = 8192;

/// Best-known capabilities for a provider/model pair.
///
/// Unknown models get the provider's baseline, or [`Capabilities::default`]
/// when nothing is known about the provider.
pub fn capabilities_for(provider: ProviderKind, model_name: &str) -> Capabilities {
    let mut caps = Capabilities::default();

    match provider {
        ProviderKind::Anthropic => {
            caps.max_tokens = 100_000;
            caps.token_limit = 100_000;
            if model_name.contains("claude-3") {
                caps.supports_tools = true;
                caps.supports_json_mode = true;
                caps.supports_streaming = true;
            }
        }
        ProviderKind::OpenAi => {
            caps.supports_tools = true;
            caps.supports_json_mode = true;
            caps.supports_streaming = true;
            caps.token_limit = if model_name.contains("32k") {
                32_000
            } else if model_name.contains("turbo") {
                128_000
            } else {
                8_000
            };
        }
        ProviderKind::Gemini => {
            caps.supports_streaming = true;
            caps.supports_json_mode = true;
            if let Some((token_limit, vision)) = gemini_family(model_name) {
                caps.supports_tools = true;
                caps.supports_vision = vision;
                caps.max_tokens = GEMINI_OUTPUT_TOKENS;
                caps.token_limit = token_limit;
            }
        }
        ProviderKind::Local => {
            let lower = model_name.to_lowercase();
            if lower.contains("llama") {
                caps.supports_streaming = true;
                caps.token_limit = 4096;
            } else if lower.contains("mistral") {
                caps.supports_streaming = true;
                caps.supports_tools = true;
                caps.token_limit = 8192;
            }
        }
        ProviderKind::AzureOpenAi => {}
    }

    caps
}

/// Context window and vision support per Gemini/Gemma family. More specific
/// names are matched first.
fn gemini_family(model_name: &str) -> Option<(u32, bool)> {
    let families: [(&str, u32, bool); 8] = [
        ("gemini-2.5-pro", 2_000_000, true),
        ("gemini-2.5-flash", 1_500_000, true),
        ("gemini-2.0-flash-lite", 800_000, true),
        ("gemini-2.0-flash", 1_000_000, true),
        ("gemini-1.5-pro", 1_000_000, true),
        ("gemini-1.5-flash", 1_000_000, true),
        ("gemini-1.0-pro", 32_000, false),
        ("gemma-3-1b-it", 32_000, false),
    ];

    if let Some((_, limit, vision)) = families
        .iter()
        .find(|(family, _, _)| model_name.contains(family))
    {
        return Some((*limit, *vision));
    }

    let bare = model_name.rsplit('/').next().unwrap_or(model_name);
    matches!(bare, "gemma-3-4b-it" | "gemma-3-12b-it" | "gemma-3-27b-it").then_some((128_000, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_claude_3() {
        let caps = capabilities_for(ProviderKind::Anthropic, "claude-3-5-sonnet-20241022");
        assert!(caps.supports_tools && caps.supports_streaming && caps.supports_json_mode);
        assert_eq!(caps.token_limit, 100_000);

        let legacy = capabilities_for(ProviderKind::Anthropic, "claude-2.1");
        assert!(!legacy.supports_tools);
        assert_eq!(legacy.max_tokens, 100_000);
    }

    #[test]
    fn test_openai_context_windows() {
        assert_eq!(capabilities_for(ProviderKind::OpenAi, "gpt-4-32k").token_limit, 32_000);
        assert_eq!(capabilities_for(ProviderKind::OpenAi, "gpt-4-turbo").token_limit, 128_000);
        assert_eq!(capabilities_for(ProviderKind::OpenAi, "gpt-4").token_limit, 8_000);
        assert_eq!(
            capabilities_for(ProviderKind::AzureOpenAi, "gpt-4"),
            Capabilities::default()
        );
    }

    #[test]
    fn test_gemini_families() {
        let flash = capabilities_for(ProviderKind::Gemini, "models/gemini-2.5-flash");
        assert_eq!(flash.token_limit, 1_500_000);
        assert!(flash.supports_vision);

        let lite = capabilities_for(ProviderKind::Gemini, "gemini-2.0-flash-lite");
        assert_eq!(lite.token_limit, 800_000);

        let tiny = capabilities_for(ProviderKind::Gemini, "gemma-3-1b-it");
        assert_eq!(tiny.token_limit, 32_000);
        assert!(!tiny.supports_vision);

        let gemma = capabilities_for(ProviderKind::Gemini, "gemma-3-27b-it");
        assert_eq!(gemma.token_limit, 128_000);
        assert!(gemma.supports_vision && gemma.supports_tools);

        let unknown = capabilities_for(ProviderKind::Gemini, "something-else");
        assert!(unknown.supports_streaming && !unknown.supports_tools);
    }

    #[test]
    fn test_local_models() {
        let llama = capabilities_for(ProviderKind::Local, "Llama3-8B");
        assert_eq!(llama.token_limit, 4096);
        assert!(!llama.supports_tools);

        let mistral = capabilities_for(ProviderKind::Local, "mistral-7b");
        assert_eq!(mistral.token_limit, 8192);
        assert!(mistral.supports_tools);

        assert_eq!(
            capabilities_for(ProviderKind::Local, "deepseek-chat"),
            Capabilities::default()
        );
    }
}
