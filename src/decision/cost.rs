//! Per-model cost accounting (§4.5 "Cost").

/// `(input $/1K tokens, output $/1K tokens)`.
type Rate = (f64, f64);

const RATES: &[(&str, Rate)] = &[
    ("openai/gpt-4o", (0.0025, 0.0100)),
    ("openai/gpt-4o-mini", (0.00015, 0.0006)),
    ("anthropic/claude-3-5-sonnet", (0.0030, 0.0150)),
    ("google/gemini-1.5-pro", (0.00125, 0.0050)),
];

/// A conservative fallback rate applied to unrecognized model ids, biased
/// high so unknown-model cost accounting never silently under-reports.
const FALLBACK_RATE: Rate = (0.0050, 0.0150);

/// Cost in dollars for one model call, given its token usage.
pub fn call_cost(model_id: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let (input_rate, output_rate) = RATES
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, rate)| *rate)
        .unwrap_or(FALLBACK_RATE);

    (prompt_tokens as f64 / 1000.0) * input_rate + (completion_tokens as f64 / 1000.0) * output_rate
}

/// Estimated token usage charged for a fallback decision (§4.5 "Failure
/// mode"), so cost accounting isn't silently skipped on model failure.
pub const FALLBACK_PROMPT_TOKENS: u32 = 1500;
/// See `FALLBACK_PROMPT_TOKENS`.
pub const FALLBACK_COMPLETION_TOKENS: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_rate() {
        let cost = call_cost("openai/gpt-4o", 1000, 1000);
        assert!((cost - (0.0025 + 0.0100)).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_uses_the_conservative_fallback() {
        let cost = call_cost("some/unlisted-model", 1000, 1000);
        assert!((cost - (FALLBACK_RATE.0 + FALLBACK_RATE.1)).abs() < 1e-9);
    }

    #[test]
    fn fallback_decision_tokens_are_never_zero() {
        assert!(FALLBACK_PROMPT_TOKENS > 0);
        assert!(FALLBACK_COMPLETION_TOKENS > 0);
    }
}
