/// Canned refinement instructions offered next to the refinement field.
pub const REFINEMENT_SUGGESTIONS: [&str; 8] = [
    "Change the background to a futuristic cityscape at night.",
    "Add dramatic cinematic lighting from the left.",
    "Make the color palette warmer and more vibrant.",
    "Render the image in a detailed anime style.",
    "Add a subtle motion blur to create a sense of action.",
    "Change the subject's clothing to a steampunk aesthetic.",
    "Incorporate elements of watercolor painting.",
    "Add a text overlay that says 'DREAM BIG'.",
];

/// Pick an entry from a suggestion list; `None` when the selector is out of range.
pub fn choose<'a>(list: &[&'a str], selector: usize) -> Option<&'a str> {
    list.get(selector).copied()
}
