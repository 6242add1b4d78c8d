//! The fixed instruction sent with every crop image.
//!
//! The CSV shape below is an external contract: the downstream takeoff
//! tooling parses these exact section headers, column headers, and comma
//! counts. Centralising the instruction here keeps that contract in one
//! place and lets tests inspect it without a live model. The service never
//! validates the reply against the contract — the model is trusted to
//! honour it, and the text is returned verbatim.

/// Instruction for transcribing an MTO table crop into three-section CSV.
pub const EXTRACTION_PROMPT: &str = r#"Generate a CSV string that exactly replicates the material take-off table in the provided image.

The CSV represents data organized under three distinct section headers:

'FABRICATION MATERIALS': this header occupies a full row, followed by four commas (e.g., "FABRICATION MATERIALS",,,,).
'ERECTION MATERIALS': this header also occupies a full row, followed by four commas (e.g., "ERECTION MATERIALS",,,,).
'CUT PIPE LENGTH': this header occupies a full row, followed by seven commas (e.g., "CUT PIPE LENGTH",,,,,,,).

Each section header is followed by its column headers, then the exact data rows as shown in the image.

The column headers for 'FABRICATION MATERIALS' and 'ERECTION MATERIALS' are: 'PT NO', 'COMPONENT DESCRIPTION', 'N.S. (MM)', 'ITEM CODE', 'QTY'.

The column headers for 'CUT PIPE LENGTH' are: 'PIECE NO', 'CUT LENGTH', 'N.S. (MM)', 'REMARKS', 'PIECE NO', 'CUT LENGTH', 'N.S. (MM)', 'REMARKS'.

Include an empty line (a single newline character) between the end of one section's data and the beginning of the next section's header.

All section headers and any data values containing spaces or special characters (like slashes or hyphens in descriptions) must be enclosed in double quotes.

Your response must contain ONLY the generated CSV string, without any additional text, explanations, or formatting."#;
