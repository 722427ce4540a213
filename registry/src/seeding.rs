//! Registrations derived from the settings tree.

use crate::request::RegistrationRequest;
use config::LlmSettings;
use mr_core::{Capabilities, ProviderKind, Purpose};

/// Metadata value marking records seeded from settings.
pub const SETTINGS_SOURCE: &str = "settings";

/// Fitness of a provider's default model as `(general, transformer, validator)`.
pub fn seed_scores(provider: ProviderKind, model_name: &str) -> (f64, f64, f64) {
    match provider {
        ProviderKind::Anthropic => (1.0, 0.9, 0.8),
        ProviderKind::OpenAi | ProviderKind::AzureOpenAi => (1.0, 0.8, 0.9),
        ProviderKind::Local => (1.0, 0.7, 0.7),
        ProviderKind::Gemini => gemini_scores(model_name),
    }
}

fn gemini_scores(model_name: &str) -> (f64, f64, f64) {
    let table: [(&str, (f64, f64, f64)); 7] = [
        ("gemma-3-27b-it", (0.9, 0.9, 0.85)),
        ("gemma-3-12b-it", (0.8, 0.8, 0.8)),
        ("gemma-3-4b-it", (0.75, 0.7, 0.7)),
        ("gemma-3-1b-it", (0.6, 0.6, 0.6)),
        ("gemini-2.5", (0.95, 0.95, 0.9)),
        ("gemini-2.0", (0.9, 0.9, 0.85)),
        ("gemini-1.5", (0.85, 0.85, 0.8)),
    ];
    table
        .iter()
        .find(|(family, _)| model_name.contains(family))
        .map_or((0.8, 0.8, 0.75), |(_, scores)| *scores)
}

/// One request per enabled provider, in declaration order.
pub fn seed_requests(llm: &LlmSettings) -> Vec<RegistrationRequest> {
    llm.enabled_providers()
        .map(|(kind, provider)| {
            let (general, transformer, validator) = seed_scores(kind, &provider.default_model);
            RegistrationRequest::new(kind, provider.default_model.clone())
                .with_scores([
                    (Purpose::GENERAL, general),
                    (Purpose::TRANSFORMER, transformer),
                    (Purpose::VALIDATOR, validator),
                ])
                .with_purposes([Purpose::GENERAL, Purpose::TRANSFORMER, Purpose::VALIDATOR])
                .with_default_config(provider.additional_settings.clone())
                .with_metadata("source", SETTINGS_SOURCE)
        })
        .collect()
}

/// Request for an ad hoc model with scores derived from its capabilities.
///
/// Every purpose starts at 0.7; tool support adds 0.1.
pub fn custom_model_request(
    provider: ProviderKind,
    model_name: &str,
    purposes: &[Purpose],
    capabilities: Option<Capabilities>,
) -> RegistrationRequest {
    let tools = capabilities
        .as_ref()
        .is_some_and(|caps| caps.supports_tools);
    let score = if tools { 0.8 } else { 0.7 };

    let mut request = RegistrationRequest::new(provider, model_name)
        .with_purposes(purposes.iter().cloned())
        .with_metadata("source", "custom");
    if purposes.is_empty() {
        request = request.with_purpose(Purpose::GENERAL);
    }
    let declared = request.purposes.clone();
    request = request.with_scores(declared.into_iter().map(|p| (p, score)));
    match capabilities {
        Some(caps) => request.with_capabilities(caps),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::LlmSettings;

    #[test]
    fn test_provider_scores() {
        assert_eq!(seed_scores(ProviderKind::Anthropic, "claude-3-opus"), (1.0, 0.9, 0.8));
        assert_eq!(seed_scores(ProviderKind::AzureOpenAi, "gpt-4"), (1.0, 0.8, 0.9));
        assert_eq!(seed_scores(ProviderKind::Local, "llama3"), (1.0, 0.7, 0.7));
    }

    #[test]
    fn test_gemini_scores_by_family() {
        assert_eq!(seed_scores(ProviderKind::Gemini, "models/gemini-2.5-flash"), (0.95, 0.95, 0.9));
        assert_eq!(seed_scores(ProviderKind::Gemini, "gemma-3-27b-it"), (0.9, 0.9, 0.85));
        assert_eq!(seed_scores(ProviderKind::Gemini, "gemma-3-4b-it"), (0.75, 0.7, 0.7));
        assert_eq!(seed_scores(ProviderKind::Gemini, "gemini-pro"), (0.8, 0.8, 0.75));
    }

    #[test]
    fn test_default_settings_seed_enabled_providers() {
        let requests = seed_requests(&LlmSettings::default());
        let ids: Vec<String> = requests.iter().map(RegistrationRequest::model_id).collect();
        assert_eq!(
            ids,
            vec![
                "anthropic-claude-3-5-sonnet-20241022",
                "openai-gpt-4",
                "gemini-models/gemini-2.5-flash",
            ]
        );

        let anthropic = &requests[0];
        assert_eq!(anthropic.purposes.len(), 3);
        assert_eq!(anthropic.scores[&Purpose::new(Purpose::VALIDATOR)], 0.8);
        assert_eq!(anthropic.metadata["source"], SETTINGS_SOURCE);
    }

    #[test]
    fn test_custom_model_scores() {
        let tools = Capabilities {
            supports_tools: true,
            ..Capabilities::default()
        };
        let request = custom_model_request(
            ProviderKind::Local,
            "mixtral",
            &[Purpose::new("qa")],
            Some(tools),
        );
        assert_eq!(request.scores[&Purpose::new("qa")], 0.8);

        let plain = custom_model_request(ProviderKind::Local, "phi", &[], None);
        assert_eq!(plain.purposes, vec![Purpose::general()]);
        assert_eq!(plain.scores[&Purpose::general()], 0.7);
        assert!(plain.capabilities.is_none());
    }
}
