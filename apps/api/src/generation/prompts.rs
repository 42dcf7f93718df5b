// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for report writing.
pub const REPORT_SYSTEM: &str = "You are a professional report writer. \
    Your goal is to produce a high-quality, professional report. \
    STYLE GUIDELINES: \
    1. PREFER PARAGRAPHS: do not use bullet points to pad length; write cohesive, well-structured paragraphs. \
    2. NO FLUFF: every sentence must carry meaning. \
    3. COMPLETE THE REPORT: cover ALL sections of the outline; do not spend the budget on the introduction and run out before the conclusion.";

/// Outline used when the request does not bring its own.
pub const DEFAULT_OUTLINE: &str = "INTRODUCTION
 1.1 PROJECT PREAMBLE
 1.2 PROBLEM STATEMENT
 1.3 PROJECT OBJECTIVES
 1.4 SCOPE OF THE PROJECT

HARDWARE AND SOFTWARE REQUIREMENTS
 2.1 HARDWARE REQUIREMENTS
 2.2 SOFTWARE AND LIBRARY REQUIREMENTS

USE CASE, STATE DIAGRAM, ER DIAGRAM
 3.1 USE CASE DIAGRAM
 3.2 STATE DIAGRAM
 3.3 ENTITY-RELATIONSHIP (ER) DIAGRAM
 3.4 APPLICATION ARCHITECTURE DIAGRAM

METHODOLOGY
 4.1 DEVELOPMENT MODEL
 4.2 TECHNOLOGY STACK
 4.3 APPLICATION ARCHITECTURE AND DESIGN

RESULTS AND DISCUSSION
 5.1 FINAL PRODUCT
 5.2 DISCUSSION
  5.2.1 Challenges Faced
  5.2.2 Limitations of the Current System

CONCLUSION AND SCOPE OF FUTURE WORK
 6.1 CONCLUSION
 6.2 SCOPE OF FUTURE WORK

REFERENCES";

/// Outline section. Replace `{topic}` and `{outline}`; omitted entirely when there is no outline.
pub const OUTLINE_SECTION_TEMPLATE: &str = r#"**STRICT STRUCTURE REQUIREMENT**:
You MUST follow the exact structure below for the main headings and subheadings.
The content under each heading must be relevant to the topic "{topic}" while adhering to this outline.
If a section is not applicable to the topic, mention it briefly or adapt it, but DO NOT remove the main headings.

**REQUIRED OUTLINE**:
{outline}
"#;

/// Report prompt. Replace: {topic}, {outline_section}, {word_count}, {min_words}, {max_words},
/// {json_only_instruction}
pub const REPORT_PROMPT_TEMPLATE: &str = r#"Generate a report on the topic: "{topic}".

{outline_section}
**CRITICAL CONTENT REQUIREMENTS:**

1. **Hardware & Software Requirements**: technical specs only, formatted as "Requirement: Value/Version" (e.g. "RAM: 16GB"). No definitions or textbook explanations.
2. **TARGET WORD COUNT**: approximately **{word_count} words**, staying between {min_words} and {max_words}. Use this to pace yourself.
3. **Content Distribution**: methodology, discussion and architecture carry the depth; introduction and requirements stay to the point.
4. **Sub-headings**: use heading2 for major subsections and heading3 frequently to break complex topics into finer detail.

**Output Format:**
Return a JSON object with this EXACT schema:
{
  "report": [
    {"type": "heading1", "text": "..."},
    {"type": "paragraph", "text": "..."}
  ]
}
- Allowed "type" values: "heading1", "heading2", "heading3", "paragraph", "bullet", "numbered".
- Do NOT start with a title block repeating the topic; start directly with the first section heading.
- Do NOT put list markers ("•", "1.") in the text of bullet or numbered blocks.

{json_only_instruction}"#;
