// Prompt template for resume optimization.
// Inputs are appended verbatim after the instructions; nothing is escaped or
// truncated here.

/// Role, inputs, required output fields and output format.
pub const OPTIMIZE_INSTRUCTIONS: &str = r#"You are a highly skilled AI resume optimizer and career coach. Your task is to analyze a candidate's resume and a target job description.

Analyze the following:
1. **Resume Content:** The candidate's resume text.
2. **Job Description:** The target job description.

Based on your analysis, produce the following:
- **optimized_resume:** Rewrite the resume to be highly tailored to the job description. Incorporate relevant keywords and rephrase bullet points to highlight skills and experience that match the job description. Do not invent experience the candidate does not have.
- **ats_score:** An estimated ATS (Applicant Tracking System) score for the optimized resume, as an integer from 0 to 100. Base it on keyword coverage, formatting, and the use of standard resume sections.
- **modifications:** A list of the key changes you made, one short sentence per item, such as "Added key skills from the job description" or "Rephrased experience bullet points".
- **upskilling_suggestions:** Based on gaps between the resume and the job description, a list of 3-5 relevant skills, courses, or certifications the candidate could pursue to be a better fit.

OUTPUT FORMAT:
- The optimized resume must be clean text. Use markdown only for structure (headings, **bold**, bullet lists); no tables, HTML, or other formatting.
- Respond with a single JSON object with exactly these keys: "optimized_resume" (string), "ats_score" (integer), "modifications" (array of strings), "upskilling_suggestions" (array of strings).
- Do NOT include any text outside the JSON object."#;

pub const RESUME_HEADER: &str = "**Candidate Resume:**";
pub const JOB_DESCRIPTION_HEADER: &str = "**Job Description:**";

/// Renders the optimization prompt. Pure and deterministic.
pub fn build_prompt(resume_text: &str, job_description: &str) -> String {
    let mut prompt = String::with_capacity(
        OPTIMIZE_INSTRUCTIONS.len() + resume_text.len() + job_description.len() + 64,
    );
    prompt.push_str(OPTIMIZE_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(RESUME_HEADER);
    prompt.push('\n');
    prompt.push_str(resume_text);
    prompt.push_str("\n\n");
    prompt.push_str(JOB_DESCRIPTION_HEADER);
    prompt.push('\n');
    prompt.push_str(job_description);
    prompt.push('\n');
    prompt
}
