//! The catalog of selectable models.
//!
//! A fixed table of the models the editor offers, with display metadata and
//! per-million-token pricing used for the usage cost estimate.

use crate::adapters::Usage;
use crate::providers::Provider;
use serde::Serialize;

/// Model the editor selects when the user has not picked one.
pub const DEFAULT_MODEL_ID: &str = "gpt-4.1-nano";

#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub provider: Provider,
    pub display_name: &'static str,
    pub description: &'static str,
    /// USD per million input tokens.
    pub input_price: f64,
    /// USD per million output tokens.
    pub output_price: f64,
    /// 1 (slowest) to 5 (fastest).
    pub speed: u8,
    /// 1 (lowest) to 5 (highest).
    pub quality: u8,
}

const CATALOG: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gpt-4.1-nano",
        provider: Provider::OpenAi,
        display_name: "GPT-4.1 Nano",
        description: "Fastest and cheapest",
        input_price: 0.10,
        output_price: 0.40,
        speed: 5,
        quality: 2,
    },
    ModelDescriptor {
        id: "gpt-4.1-mini",
        provider: Provider::OpenAi,
        display_name: "GPT-4.1 Mini",
        description: "Balanced",
        input_price: 0.40,
        output_price: 1.60,
        speed: 4,
        quality: 3,
    },
    ModelDescriptor {
        id: "gpt-4o-mini",
        provider: Provider::OpenAi,
        display_name: "GPT-4o Mini",
        description: "Fast multimodal",
        input_price: 0.15,
        output_price: 0.60,
        speed: 5,
        quality: 3,
    },
    ModelDescriptor {
        id: "claude-haiku-4-5-20251001",
        provider: Provider::Anthropic,
        display_name: "Claude 4.5 Haiku",
        description: "Fastest and cheapest",
        input_price: 0.80,
        output_price: 4.00,
        speed: 5,
        quality: 3,
    },
    ModelDescriptor {
        id: "claude-sonnet-4-5-20250929",
        provider: Provider::Anthropic,
        display_name: "Claude 4.5 Sonnet",
        description: "Balanced",
        input_price: 3.00,
        output_price: 15.00,
        speed: 3,
        quality: 4,
    },
    ModelDescriptor {
        id: "gemini-2.5-flash-lite",
        provider: Provider::Gemini,
        display_name: "Gemini 2.5 Flash Lite",
        description: "Fastest and cheapest",
        input_price: 0.00,
        output_price: 0.00,
        speed: 5,
        quality: 2,
    },
    ModelDescriptor {
        id: "gemini-2.5-flash",
        provider: Provider::Gemini,
        display_name: "Gemini 2.5 Flash",
        description: "Balanced",
        input_price: 0.10,
        output_price: 0.40,
        speed: 4,
        quality: 3,
    },
];

impl ModelDescriptor {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.input_price == 0.0 && self.output_price == 0.0
    }

    /// Cost in USD of a call with the given token usage.
    #[must_use]
    pub fn cost(&self, usage: &Usage) -> f64 {
        (usage.input_tokens as f64 / 1e6) * self.input_price
            + (usage.output_tokens as f64 / 1e6) * self.output_price
    }
}

#[must_use]
pub fn all_models() -> &'static [ModelDescriptor] {
    CATALOG
}

#[must_use]
pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    CATALOG.iter().find(|m| m.id == id)
}

pub fn models_for(provider: Provider) -> impl Iterator<Item = &'static ModelDescriptor> {
    CATALOG.iter().filter(move |m| m.provider == provider)
}

/// Estimated USD cost of a call, or `None` if the model is not cataloged.
#[must_use]
pub fn estimate_cost(model_id: &str, usage: &Usage) -> Option<f64> {
    find_model(model_id).map(|m| m.cost(usage))
}
