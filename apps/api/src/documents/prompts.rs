// Document intake LLM prompt templates.
// All prompts for the documents module are defined here.

pub const EXTRACTION_SYSTEM: &str = "\
You are an expert document analyst specializing in professional services documents. \
You extract key information from business, legal, financial and medical documents. \
You MUST respond with a single JSON object only — no markdown fences, no explanations. \
Report your honest confidence; never inflate it.";

pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Analyze the following document and extract key information in a structured format.

DOCUMENT TEXT:
{document_text}

{type_hint}

OUTPUT SCHEMA (return exactly this structure):
{
  "documentType": "contract" | "invoice" | "legal" | "financial" | "medical" | "other",
  "keyEntities": {
    "parties": "comma-separated entity names",
    "amount": "value if financial",
    "date": "key dates",
    "location": "relevant locations",
    "deadline": "important deadlines"
  },
  "summary": "Brief 2-3 sentence summary of the document",
  "tags": ["tag1", "tag2", "tag3"],
  "confidence": 0.95,
  "riskFlags": ["flag1 if any risks detected"]
}

RULES:
1. Every keyEntities value must be a string or a number. Join lists into one comma-separated string.
2. Omit keyEntities keys that do not apply to this document.
3. confidence is a number between 0 and 1.
4. riskFlags is an empty list when no risks are detected.
5. If this is a legal document, pay special attention to obligations, deadlines, and financial terms.
6. Return ONLY the JSON object — nothing else, no code fences."#;

pub const TYPE_HINT_TEMPLATE: &str = "EXPECTED DOCUMENT TYPE: {document_type}";

pub const TRANSCRIBE_SYSTEM: &str = "\
You are a document transcription engine. You copy text exactly as it appears. \
You never summarize, translate, or add commentary.";

pub const TRANSCRIBE_PROMPT: &str = "\
Extract all text content from this document image. \
Maintain the structure and formatting as much as possible. \
Capture all visible text faithfully for further analysis.";

pub const SEARCH_PROMPT_TEMPLATE: &str = r#"Given the search query and the list of documents below, rank the documents by relevance.

SEARCH QUERY: "{query}"

DOCUMENTS:
{documents}

Return the document indices in order of relevance (most relevant first).
Format: [0, 2, 1] (just the array of indices)"#;
