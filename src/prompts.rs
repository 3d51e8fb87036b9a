//! Prompts for LLM-based report analysis.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the analysis behaviour (e.g.
//!    adding a partner platform or tweaking the output schema) requires
//!    editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model, making prompt regressions easy to catch.
//!
//! Two prompts exist: the full first-attempt prompt and a shorter, stricter
//! retry prompt used once when the first response cannot be parsed or fails
//! validation. The retry prompt shows a single literal example object
//! because models that ignored the schema description usually comply with a
//! concrete example.

use crate::pipeline::llm::AnalysisRequest;

/// Partner-platform context embedded in the first-attempt prompt.
///
/// Platforms are described, not enumerated as a closed set — an unknown
/// platform tag still produces a sensible analysis.
pub const PLATFORM_CONTEXT: &str = "\
Platform Context:
- NeuroAge: Focuses on brain aging, cognitive biomarkers, and neurological health
- Jona Health: Comprehensive health optimization and biomarker analysis
- Iollo: Advanced longevity testing and biological age assessment
- Function Health: Metabolic health and functional medicine
- TokuEyes: Eye health and retinal biomarkers";

/// Build the first-attempt analysis prompt.
///
/// Embeds, in order: the analyst framing, the platform context, the exact
/// output JSON schema, the extraction rules (real values only, never
/// placeholders, raw JSON only), and the report text with its metadata.
pub fn analysis_prompt(req: &AnalysisRequest) -> String {
    format!(
        r#"You are an expert longevity and healthspan analyst. Your task is to analyze PDF reports from various longevity platforms and provide concise, actionable insights based on the actual content.

{platform_context}

CRITICAL: You MUST return a JSON object with EXACTLY this structure:
{{
  "summary": "2-3 sentence summary based on actual PDF content",
  "keyMetrics": [
    {{
      "name": "Exact metric name from the report (e.g., 'CRP', 'HbA1c', 'Vitamin D')",
      "value": "Actual value from the report (e.g., '0.8 mg/L', '5.2%', '32 ng/mL')",
      "status": "normal/elevated/low/critical based on actual values",
      "description": "What this metric means and its health implications"
    }}
  ],
  "recommendations": [
    "Specific actionable recommendation based on actual findings"
  ],
  "riskFactors": [
    "Specific risk factor identified from actual data"
  ],
  "trends": [
    {{
      "metric": "Metric name",
      "direction": "improving/declining/stable",
      "change": "Specific change description",
      "period": "Time period"
    }}
  ]
}}

IMPORTANT RULES:
1. Extract ONLY real values, metrics, and findings from the provided report text
2. Do NOT generate placeholder or generic information
3. If a metric is not clearly stated in the report, do NOT include it
4. Use actual biomarker names and values from the report
5. Return ONLY the raw JSON object, no markdown, no code blocks, no additional text
6. Ensure the JSON is valid and properly formatted

Please analyze this {platform} report and provide insights in the specified JSON format:

Filename: {filename}
Platform: {platform}
Report Content: {content}

Focus on:
- Key biomarkers and their actual values from the report
- Healthspan implications based on the data
- Actionable lifestyle and supplement recommendations from the findings
- Risk assessment based on actual results
- Trend analysis if multiple measurements are available

Return only the JSON response, no additional text."#,
        platform_context = PLATFORM_CONTEXT,
        platform = req.platform,
        filename = req.filename,
        content = req.content,
    )
}

/// Build the single-retry prompt: shorter, stricter, with one literal
/// example object instead of a schema description.
pub fn retry_prompt(req: &AnalysisRequest) -> String {
    format!(
        r#"You are analyzing a {platform} health report. The report content is: {content}

You MUST return ONLY a JSON object with this EXACT structure - no other text:

{{
  "summary": "Brief summary of the actual findings from the report",
  "keyMetrics": [
    {{
      "name": "CRP",
      "value": "0.8 mg/L",
      "status": "normal",
      "description": "C-reactive protein level indicating inflammation status"
    }}
  ],
  "recommendations": [
    "Specific recommendation based on actual data"
  ],
  "riskFactors": [
    "Specific risk identified from the data"
  ],
  "trends": [
    {{
      "metric": "CRP",
      "direction": "stable",
      "change": "No significant change",
      "period": "Recent"
    }}
  ]
}}

IMPORTANT: Only include metrics that are actually mentioned in the report text. If you cannot find specific values, do not make them up."#,
        platform = req.platform,
        content = req.content,
    )
}
