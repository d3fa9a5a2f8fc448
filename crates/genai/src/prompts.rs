/// Prompt construction for every generation operation.
use crate::options::{AnimationStyle, OutputType, VideoDuration};

/// Returned instead of calling the backend when there is nothing to ideate from.
pub const NEED_INPUT_MESSAGE: &str = "Please provide an image or a topic to generate ideas.";

pub const BACKGROUND_REMOVAL_PROMPT: &str = "Critically important: Remove the background from the provided image. The new background must be transparent. Retain all details of the main subject. Output only the modified image as a PNG with a transparent background.";

/// Concept prompt, or `None` when neither images nor a topic are available.
pub fn concept_prompt(has_images: bool, output_type: OutputType, topic: Option<&str>) -> Option<String> {
    let base = format!(
        "Generate a detailed, creative, and professional concept for a {}. The concept should be at least 300 characters long and describe a unique, high-quality studio design idea. Describe the mood, color palette, potential text overlays, and overall composition. The final output should be suitable for a high-end design project.",
        output_type.label()
    );
    let topic = topic.map(str::trim).filter(|t| !t.is_empty());
    if has_images {
        Some(format!("Analyze the provided image(s). {base}"))
    } else {
        topic.map(|topic| format!("{base} The concept should be based on the topic: \"{topic}\"."))
    }
}

/// Image generation prompt. An empty concept falls back to a prompt derived
/// from the output type and the reference images.
pub fn generation_prompt(concept: &str, output_type: OutputType, has_references: bool, aspect_ratio: &str) -> String {
    let concept = concept.trim();
    if !concept.is_empty() {
        return format!(
            "Generate a high-quality, professional, upscaled, studio-quality, cinematic, premium image design based on the following concept: \"{concept}\". The image should be in a {aspect_ratio} aspect ratio. If reference images are provided, use them as stylistic and compositional inspiration. Ensure the final image is clear, detailed, and visually stunning. The central subject should be the hero of the image, placed in an immersive, high-quality environment. Output only the generated image."
        );
    }
    if has_references {
        format!(
            "Based on the provided reference image(s), generate a new, high-quality, professional, upscaled, studio-quality, cinematic, premium image design in the style of a {}. The new image should be in a {aspect_ratio} aspect ratio, using the reference image(s) for stylistic and compositional inspiration. Ensure the final result is a complete, clear, detailed, and visually stunning piece. Output only the generated image.",
            output_type.label()
        )
    } else {
        format!(
            "Generate a new, high-quality, professional, upscaled, studio-quality, cinematic, premium image design in the style of a {}. The image should be in a {aspect_ratio} aspect ratio. Ensure the final result is a complete, clear, detailed, and visually stunning piece. Output only the generated image.",
            output_type.label()
        )
    }
}

pub fn refinement_prompt(instruction: &str) -> String {
    format!(
        "Take the provided image and refine it based on the following instruction: \"{}\". Apply the change while maintaining the overall quality and style of the original image. Output only the refined image.",
        instruction.trim()
    )
}

pub fn video_prompt(concept: &str, duration: VideoDuration, style: AnimationStyle) -> String {
    format!(
        "Based on the provided image and original concept, create a short, {}-second video with high-quality, {} animation. Original concept: \"{}\"",
        duration.secs(),
        style.phrase(),
        concept
    )
}

/// Prompt recorded on an artifact generated without a concept.
pub fn fallback_artifact_prompt(output_type: OutputType) -> String {
    format!("Generated {} from reference image(s).", output_type.label())
}

/// Prompt recorded on a refined artifact, keeping the chain traceable.
pub fn refined_artifact_prompt(original: &str, instruction: &str) -> String {
    format!("Refined from original prompt \"{original}\" with: {}", instruction.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_prompt_short_circuit() {
        assert!(concept_prompt(false, OutputType::Banner, None).is_none());
        assert!(concept_prompt(false, OutputType::Banner, Some("   ")).is_none());
    }

    #[test]
    fn test_concept_prompt_variants() {
        let with_images = concept_prompt(true, OutputType::Flier, Some("ignored")).unwrap();
        assert!(with_images.starts_with("Analyze the provided image(s)."));
        assert!(with_images.contains("Flier"));
        assert!(!with_images.contains("ignored"));

        let with_topic = concept_prompt(false, OutputType::Flier, Some("retro sci-fi")).unwrap();
        assert!(with_topic.ends_with("based on the topic: \"retro sci-fi\"."));
    }

    #[test]
    fn test_generation_prompt_fallback() {
        let prompt = generation_prompt("", OutputType::WeddingCard, true, "4:3");
        assert!(prompt.starts_with("Based on the provided reference image(s)"));
        assert!(prompt.contains("Wedding Card"));
        assert!(prompt.contains("4:3"));

        let prompt = generation_prompt("a neon koi pond", OutputType::WeddingCard, false, "1:1");
        assert!(prompt.contains("\"a neon koi pond\""));
    }

    #[test]
    fn test_artifact_prompts() {
        assert_eq!(
            fallback_artifact_prompt(OutputType::CinematicPoster),
            "Generated Cinematic Poster from reference image(s)."
        );
        let refined = refined_artifact_prompt("P", " make it darker ");
        assert_eq!(refined, "Refined from original prompt \"P\" with: make it darker");
    }

    #[test]
    fn test_video_prompt() {
        let prompt = video_prompt(
            "sunset city",
            VideoDuration::new(6).unwrap(),
            AnimationStyle::PanUp,
        );
        assert!(prompt.contains("6-second"));
        assert!(prompt.contains("pan up animation"));
        assert!(prompt.contains("\"sunset city\""));
    }
}
