use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Random prompt selection within the current level.
pub struct PromptPicker {
    lines: Vec<String>,
    last: Option<usize>,
    rng: SmallRng,
}

impl PromptPicker {
    pub fn new(lines: Vec<String>) -> Self {
        Self::with_rng(lines, SmallRng::from_entropy())
    }

    pub fn with_seed(lines: Vec<String>, seed: u64) -> Self {
        Self::with_rng(lines, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(lines: Vec<String>, rng: SmallRng) -> Self {
        Self {
            lines,
            last: None,
            rng,
        }
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
        self.last = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// A random line, never the same one twice in a row when there is a choice.
    /// `None` when the level has no lines.
    pub fn next_prompt(&mut self) -> Option<String> {
        let idx = match self.lines.len() {
            0 => return None,
            1 => 0,
            n => match self.last {
                Some(last) => {
                    let i = self.rng.gen_range(0..n - 1);
                    if i >= last { i + 1 } else { i }
                }
                None => self.rng.gen_range(0..n),
            },
        };
        self.last = Some(idx);
        Some(self.lines[idx].clone())
    }
}
