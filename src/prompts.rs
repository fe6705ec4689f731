/// Starter prompts offered while the transcript is empty
pub const EXAMPLE_PROMPTS: &[ExamplePrompt] = &[
    ExamplePrompt {
        title: "Explain a concept",
        prompt: "Explain how a hash map works, with a short example.",
    },
    ExamplePrompt {
        title: "Brainstorm",
        prompt: "Give me five name ideas for a command-line note-taking tool.",
    },
    ExamplePrompt {
        title: "Write",
        prompt: "Draft a friendly two-sentence reminder about tomorrow's team meeting.",
    },
    ExamplePrompt {
        title: "Plan",
        prompt: "Plan a three-day weekend trip to Lisbon on a moderate budget.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamplePrompt {
    pub title: &'static str,
    pub prompt: &'static str,
}

/// Prompt at `index`, wrapping around the list
pub fn example_prompt(index: usize) -> &'static ExamplePrompt {
    &EXAMPLE_PROMPTS[index % EXAMPLE_PROMPTS.len()]
}
