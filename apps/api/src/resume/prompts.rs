//! Resume extraction prompt templates.
//! The output keys must stay in sync with the profile field names in `matching::profile`.

pub const PROFILE_EXTRACT_SYSTEM: &str = "\
You are a precise resume data extractor. \
Read a candidate's resume and summarize it for job matching. \
You MUST respond with valid JSON only with no markdown fences and no explanations. \
Never invent skills, employers, or locations that the resume does not mention.";

pub const PROFILE_EXTRACT_PROMPT: &str = r#"Extract a matching profile from the resume below.

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "role": "string",            // the role the candidate holds or targets, e.g. "Backend Engineer"
  "skills": ["string"],        // concrete technical and domain skills, most relevant first
  "summary": "string",         // 2-3 sentences on what the candidate has done
  "experience": "junior" | "mid" | "mid-senior" | "senior",
  "last_location": "string"    // city of the most recent position, "" if not stated
}

EXPERIENCE BUCKETS (total years of professional work):
- "junior": under 2 years
- "mid": 2 to 5 years
- "mid-senior": 5 to 8 years
- "senior": more than 8 years

Return ONLY the JSON object. No other text."#;
