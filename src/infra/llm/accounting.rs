//! Resource-cost ("energy") accounting for provider calls.
//!
//! Costs are a pure function of prompt and response length so every vendor is
//! billed the same way regardless of what usage data it reports.

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostFormula {
    /// `base + ceil((input + output_weight * output) / divisor)`.
    TokenWeighted {
        base: u32,
        output_weight: u32,
        divisor: u32,
    },
    /// Fixed policy constant, independent of traffic.
    Flat(u32),
}

/// OpenAI family: generation-heavy, output tokens weigh double.
pub const OPENAI_COST: CostFormula = CostFormula::TokenWeighted {
    base: 1,
    output_weight: 2,
    divisor: 500,
};

/// Gemini family serves the structure-only transformation passes and is free.
pub const GEMINI_COST: CostFormula = CostFormula::Flat(0);

pub fn estimate_tokens(text_chars: usize) -> u32 {
    let tokens = text_chars.div_ceil(CHARS_PER_TOKEN);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

impl CostFormula {
    pub fn cost(self, input_tokens: u32, output_tokens: u32) -> u32 {
        match self {
            Self::Flat(cost) => cost,
            Self::TokenWeighted {
                base,
                output_weight,
                divisor,
            } => {
                let weighted = u64::from(input_tokens)
                    + u64::from(output_weight) * u64::from(output_tokens);
                let scaled = weighted.div_ceil(u64::from(divisor.max(1)));
                let total = u64::from(base).saturating_add(scaled);
                u32::try_from(total).unwrap_or(u32::MAX)
            }
        }
    }

    pub fn cost_for_text(self, prompt_chars: usize, response_chars: usize) -> u32 {
        self.cost(estimate_tokens(prompt_chars), estimate_tokens(response_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::{CostFormula, GEMINI_COST, OPENAI_COST, estimate_tokens};

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(8), 2);
        assert_eq!(estimate_tokens(9), 3);
    }

    #[test]
    fn openai_cost_weights_output_tokens() {
        // 400 input + 2 * 100 output = 600 -> ceil(600 / 500) = 2, plus base 1.
        assert_eq!(OPENAI_COST.cost(400, 100), 3);
        assert_eq!(OPENAI_COST.cost(0, 0), 1);
        assert_eq!(OPENAI_COST.cost_for_text(1600, 400), 3);
    }

    #[test]
    fn gemini_cost_is_zero_regardless_of_length() {
        assert_eq!(GEMINI_COST.cost(0, 0), 0);
        assert_eq!(GEMINI_COST.cost_for_text(100_000, 50_000), 0);
    }

    #[test]
    fn cost_is_reproducible() {
        let formula = CostFormula::TokenWeighted {
            base: 2,
            output_weight: 3,
            divisor: 100,
        };
        assert_eq!(formula.cost(150, 50), formula.cost(150, 50));
        assert_eq!(formula.cost(150, 50), 5);
    }
}
