/// Knobs for an [`crate::Interpreter`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Prompt printed by the interactive loop.
    pub prompt: String,
    /// How many backtick substitutions may be nested inside each other before
    /// evaluation gives up.
    pub max_substitution_depth: usize,
}

pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_MAX_SUBSTITUTION_DEPTH: usize = 32;

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_substitution_depth: DEFAULT_MAX_SUBSTITUTION_DEPTH,
        }
    }
}
