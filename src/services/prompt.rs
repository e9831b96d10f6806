use crate::models::generation::GenerationRequest;

/// Build the text-to-image prompt for a dataset request.
///
/// Findings are joined with ", " in the order given. The caller guarantees
/// at least one finding (enforced by request validation).
pub fn build_prompt(request: &GenerationRequest) -> String {
    let findings = request.finding.join(", ");
    format!(
        "High-resolution monochrome chest X-ray, {} view, of a {}-year-old patient. \
         The image shows signs of {} {}. \
         Medical imaging, photorealistic, 4k, detailed.",
        request.view,
        request.age,
        request.severity.as_prompt_str(),
        findings
    )
}
