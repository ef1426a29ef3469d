//! Document processing module
//!
//! Parses document `convert` operations and plans the conversion steps.
//! Document chains use prefix-tagged parameters (`source_`, `target_`,
//! `pages_`, `b_`) where a value may itself contain commas, so they get
//! their own parser instead of the generic chain grammar. Execution
//! (LibreOffice, PDF rasterization) belongs to the caller; this module
//! produces validated specs, argument vectors, and output keys.

use mediaforge_core::{b64, TransformError};
use serde::{Deserialize, Serialize};

const WORD_FORMATS: &[&str] = &[
    "doc", "docx", "wps", "wpss", "docm", "dotm", "dot", "dotx", "html",
];
const PRESENTATION_FORMATS: &[&str] = &[
    "pptx", "ppt", "pot", "potx", "pps", "ppsx", "dps", "dpt", "pptm", "potm", "ppsm", "dpss",
];
const SPREADSHEET_FORMATS: &[&str] = &[
    "xls", "xlt", "et", "ett", "xlsx", "xltx", "csv", "xlsb", "xlsm", "xltm", "ets",
];

/// Family a source format belongs to; drives the conversion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Word,
    Presentation,
    Spreadsheet,
    Pdf,
    Text,
}

/// A validated source document format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFormat {
    extension: String,
    kind: DocumentKind,
}

impl SourceFormat {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        let ext = s.to_ascii_lowercase();
        let kind = if ext == "pdf" {
            DocumentKind::Pdf
        } else if ext == "txt" {
            DocumentKind::Text
        } else if WORD_FORMATS.contains(&ext.as_str()) {
            DocumentKind::Word
        } else if PRESENTATION_FORMATS.contains(&ext.as_str()) {
            DocumentKind::Presentation
        } else if SPREADSHEET_FORMATS.contains(&ext.as_str()) {
            DocumentKind::Spreadsheet
        } else {
            return Err(TransformError::InvalidParameter(format!(
                "unsupported source format: {}",
                s
            )));
        };
        Ok(SourceFormat {
            extension: ext,
            kind,
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Pdf,
    Png,
    Jpg,
    Txt,
}

impl TargetFormat {
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "png" => Ok(TargetFormat::Png),
            "jpg" => Ok(TargetFormat::Jpg),
            "txt" => Ok(TargetFormat::Txt),
            other => Err(TransformError::InvalidParameter(format!(
                "unsupported target format: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Png => "png",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Png => "image/png",
            TargetFormat::Jpg => "image/jpeg",
            TargetFormat::Txt => "text/plain",
        }
    }
}

/// Validated parameters of a document `convert` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConvertSpec {
    /// Explicit source format; when absent the caller infers it from the
    /// object key or content sniffing.
    pub source: Option<SourceFormat>,
    pub target: TargetFormat,
    /// 1-based page numbers, sorted and deduplicated; empty = all pages.
    pub pages: Vec<u32>,
    /// Decoded target bucket name, when redirected.
    pub target_bucket: Option<String>,
}

impl DocumentConvertSpec {
    /// Parse a document operation string such as
    /// `convert,source_doc,target_png,pages_1,2,4-10,b_<base64>`.
    pub fn parse(operations: &str) -> Result<Self, TransformError> {
        let (operation, rest) = operations.split_once(',').ok_or_else(|| {
            TransformError::MalformedOperation(
                "document operation requires parameters".to_string(),
            )
        })?;
        if operation != "convert" {
            return Err(TransformError::UnknownOperation(operation.to_string()));
        }

        // Prefix-tagged parameters; untagged tokens continue the previous
        // value (page lists contain commas).
        let mut params: Vec<(&'static str, String)> = Vec::new();
        for part in rest.split(',') {
            let tagged = [
                ("source", "source_"),
                ("target", "target_"),
                ("pages", "pages_"),
                ("b", "b_"),
            ]
            .iter()
            .find_map(|(name, prefix)| part.strip_prefix(prefix).map(|v| (*name, v)));

            match tagged {
                Some((name, value)) => {
                    if params.iter().any(|(existing, _)| *existing == name) {
                        return Err(TransformError::MalformedOperation(format!(
                            "duplicate parameter '{}'",
                            name
                        )));
                    }
                    params.push((name, value.to_string()));
                }
                None => match params.last_mut() {
                    Some((_, value)) => {
                        value.push(',');
                        value.push_str(part);
                    }
                    None => {
                        return Err(TransformError::MalformedOperation(format!(
                            "unexpected token '{}'",
                            part
                        )))
                    }
                },
            }
        }

        let get = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
        };

        let source = get("source").map(|s| SourceFormat::parse(&s)).transpose()?;

        let target = match get("target") {
            Some(t) => TargetFormat::parse(&t)?,
            None => {
                return Err(TransformError::InvalidParameter(
                    "target format not specified".to_string(),
                ))
            }
        };

        let pages = match get("pages") {
            None => Vec::new(),
            Some(raw) => {
                // A bare token without range punctuation is base64-wrapped
                let decoded = if !raw.contains(|c| c == ',' || c == '-' || c == '_') {
                    b64::decode_segment(&raw).unwrap_or(raw)
                } else {
                    raw
                };
                parse_pages(&decoded)?
            }
        };

        let target_bucket = get("b").map(|b| b64::decode_segment(&b)).transpose()?;

        Ok(DocumentConvertSpec {
            source,
            target,
            pages,
            target_bucket,
        })
    }

    /// Resolve the source format: the explicit parameter wins, otherwise
    /// the object key's extension decides.
    pub fn resolve_source(&self, object_key: &str) -> Result<SourceFormat, TransformError> {
        match &self.source {
            Some(source) => Ok(source.clone()),
            None => match mediaforge_core::models::key_extension(object_key) {
                Some(ext) => SourceFormat::parse(ext),
                None => Err(TransformError::InvalidParameter(format!(
                    "cannot determine source format for '{}'",
                    object_key
                ))),
            },
        }
    }

    /// Output object key derived from the source key: PNG fan-out uses a
    /// directory prefix, page selections are encoded into the file name.
    pub fn output_key(&self, object_key: &str) -> String {
        let base = strip_extension(object_key);
        match self.target {
            TargetFormat::Png => format!("{}/", base),
            _ if self.pages.is_empty() => format!("{}.{}", base, self.target.as_str()),
            _ => {
                let indices = self
                    .pages
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("_");
                format!("{}_p{}.{}", base, indices, self.target.as_str())
            }
        }
    }

    /// Plan the conversion steps for a resolved source format.
    pub fn plan(&self, source: &SourceFormat, dpi: u32) -> ConversionPlan {
        let mut steps = Vec::new();

        match self.target {
            TargetFormat::Txt => {
                match source.kind() {
                    // Word and presentation text is extracted directly
                    DocumentKind::Word | DocumentKind::Presentation => {
                        steps.push(ConversionStep::ExtractText { pages: Vec::new() });
                    }
                    kind => {
                        if kind != DocumentKind::Pdf {
                            steps.push(ConversionStep::ConvertToPdf);
                        }
                        steps.push(ConversionStep::ExtractText {
                            pages: self.pages.clone(),
                        });
                    }
                }
            }
            TargetFormat::Pdf => {
                if source.kind() != DocumentKind::Pdf {
                    steps.push(ConversionStep::ConvertToPdf);
                }
                if !self.pages.is_empty() {
                    steps.push(ConversionStep::RasterizePages {
                        format: TargetFormat::Pdf,
                        pages: self.pages.clone(),
                        dpi,
                    });
                }
                if steps.is_empty() {
                    steps.push(ConversionStep::CopyInput);
                }
            }
            TargetFormat::Png | TargetFormat::Jpg => {
                if source.kind() != DocumentKind::Pdf {
                    steps.push(ConversionStep::ConvertToPdf);
                }
                steps.push(ConversionStep::RasterizePages {
                    format: self.target,
                    pages: self.pages.clone(),
                    dpi,
                });
            }
        }

        ConversionPlan { steps }
    }
}

/// One step of a document conversion; executed by the caller in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStep {
    /// The input already is the output (PDF to PDF, all pages).
    CopyInput,
    /// Run LibreOffice headless to produce the PDF intermediate.
    ConvertToPdf,
    /// Render the selected PDF pages (empty = all) at the given DPI.
    RasterizePages {
        format: TargetFormat,
        pages: Vec<u32>,
        dpi: u32,
    },
    /// Extract text from the selected pages (empty = all).
    ExtractText { pages: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPlan {
    pub steps: Vec<ConversionStep>,
}

/// Argument vector for a headless LibreOffice conversion (excluding the
/// binary itself).
pub fn libreoffice_convert_args(convert_to: &str, outdir: &str, input: &str) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--invisible".to_string(),
        "--nodefault".to_string(),
        "--view".to_string(),
        "--nolockcheck".to_string(),
        "--nologo".to_string(),
        "--norestore".to_string(),
        "--convert-to".to_string(),
        convert_to.to_string(),
        "--outdir".to_string(),
        outdir.to_string(),
        input.to_string(),
    ]
}

/// Expand a page-range list (`1,2,4-10`) into sorted, deduplicated 1-based
/// page numbers.
pub fn parse_pages(pages: &str) -> Result<Vec<u32>, TransformError> {
    if pages.is_empty() {
        return Ok(Vec::new());
    }

    let mut result = Vec::new();
    for part in pages.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_page_number(start)?;
                let end = parse_page_number(end)?;
                if start > end {
                    return Err(TransformError::InvalidParameter(format!(
                        "invalid page range {}-{}",
                        start, end
                    )));
                }
                result.extend(start..=end);
            }
            None => result.push(parse_page_number(part)?),
        }
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

fn parse_page_number(s: &str) -> Result<u32, TransformError> {
    let page = s.trim().parse::<u32>().map_err(|_| {
        TransformError::InvalidParameter(format!("invalid page number '{}'", s))
    })?;
    if page == 0 {
        return Err(TransformError::InvalidParameter(
            "page numbers are 1-based".to_string(),
        ));
    }
    Ok(page)
}

/// Strip the extension from the final path segment only.
fn strip_extension(key: &str) -> &str {
    match key.rfind('.') {
        Some(dot) if !key[dot..].contains('/') => &key[..dot],
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pages_expansion() {
        assert_eq!(
            parse_pages("1,2,4-10").unwrap(),
            vec![1, 2, 4, 5, 6, 7, 8, 9, 10]
        );
    }

    #[test]
    fn test_parse_pages_dedup_and_sort() {
        assert_eq!(parse_pages("5,1,3-5,1").unwrap(), vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_parse_pages_invalid() {
        assert!(parse_pages("a,2").is_err());
        assert!(parse_pages("10-4").is_err());
        assert!(parse_pages("0").is_err());
    }

    #[test]
    fn test_parse_convert_basic() {
        let spec = DocumentConvertSpec::parse("convert,source_docx,target_pdf").unwrap();
        assert_eq!(spec.source.as_ref().unwrap().extension(), "docx");
        assert_eq!(spec.source.as_ref().unwrap().kind(), DocumentKind::Word);
        assert_eq!(spec.target, TargetFormat::Pdf);
        assert!(spec.pages.is_empty());
        assert!(spec.target_bucket.is_none());
    }

    #[test]
    fn test_parse_convert_pages_with_commas() {
        let spec =
            DocumentConvertSpec::parse("convert,source_doc,target_png,pages_1,2,4-10").unwrap();
        assert_eq!(spec.pages, vec![1, 2, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_parse_convert_pages_base64() {
        let encoded = b64::encode_segment("1,2,4-10");
        let ops = format!("convert,target_pdf,pages_{}", encoded);
        let spec = DocumentConvertSpec::parse(&ops).unwrap();
        assert_eq!(spec.pages, vec![1, 2, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_parse_convert_bucket_decoded() {
        let encoded = b64::encode_segment("converted-docs");
        let ops = format!("convert,target_pdf,b_{}", encoded);
        let spec = DocumentConvertSpec::parse(&ops).unwrap();
        assert_eq!(spec.target_bucket.as_deref(), Some("converted-docs"));
    }

    #[test]
    fn test_parse_convert_requires_target() {
        let err = DocumentConvertSpec::parse("convert,source_docx").unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameter(_)));
    }

    #[test]
    fn test_parse_convert_unknown_operation() {
        let err = DocumentConvertSpec::parse("translate,target_pdf").unwrap_err();
        assert!(matches!(err, TransformError::UnknownOperation(_)));
    }

    #[test]
    fn test_parse_convert_stray_token() {
        let err = DocumentConvertSpec::parse("convert,bogus,target_pdf").unwrap_err();
        assert!(matches!(err, TransformError::MalformedOperation(_)));
    }

    #[test]
    fn test_source_format_families() {
        assert_eq!(
            SourceFormat::parse("pptx").unwrap().kind(),
            DocumentKind::Presentation
        );
        assert_eq!(
            SourceFormat::parse("CSV").unwrap().kind(),
            DocumentKind::Spreadsheet
        );
        assert_eq!(SourceFormat::parse("pdf").unwrap().kind(), DocumentKind::Pdf);
        assert!(SourceFormat::parse("exe").is_err());
    }

    #[test]
    fn test_output_key_variants() {
        let png = DocumentConvertSpec::parse("convert,target_png").unwrap();
        assert_eq!(png.output_key("reports/q3.docx"), "reports/q3/");

        let pdf = DocumentConvertSpec::parse("convert,target_pdf").unwrap();
        assert_eq!(pdf.output_key("reports/q3.docx"), "reports/q3.pdf");

        let paged = DocumentConvertSpec::parse("convert,target_jpg,pages_1,3").unwrap();
        assert_eq!(paged.output_key("q3.docx"), "q3_p1_3.jpg");

        // Dots in directory names are not extensions
        assert_eq!(pdf.output_key("v1.2/readme"), "v1.2/readme.pdf");
    }

    #[test]
    fn test_plan_word_to_pdf() {
        let spec = DocumentConvertSpec::parse("convert,source_docx,target_pdf").unwrap();
        let source = SourceFormat::parse("docx").unwrap();
        let plan = spec.plan(&source, 300);
        assert_eq!(plan.steps, vec![ConversionStep::ConvertToPdf]);
    }

    #[test]
    fn test_plan_pdf_passthrough() {
        let spec = DocumentConvertSpec::parse("convert,source_pdf,target_pdf").unwrap();
        let source = SourceFormat::parse("pdf").unwrap();
        let plan = spec.plan(&source, 300);
        assert_eq!(plan.steps, vec![ConversionStep::CopyInput]);
    }

    #[test]
    fn test_plan_pdf_page_selection() {
        let spec = DocumentConvertSpec::parse("convert,source_pdf,target_pdf,pages_2-3").unwrap();
        let source = SourceFormat::parse("pdf").unwrap();
        let plan = spec.plan(&source, 300);
        assert_eq!(
            plan.steps,
            vec![ConversionStep::RasterizePages {
                format: TargetFormat::Pdf,
                pages: vec![2, 3],
                dpi: 300,
            }]
        );
    }

    #[test]
    fn test_plan_spreadsheet_to_image() {
        let spec = DocumentConvertSpec::parse("convert,source_xlsx,target_png").unwrap();
        let source = SourceFormat::parse("xlsx").unwrap();
        let plan = spec.plan(&source, 150);
        assert_eq!(
            plan.steps,
            vec![
                ConversionStep::ConvertToPdf,
                ConversionStep::RasterizePages {
                    format: TargetFormat::Png,
                    pages: vec![],
                    dpi: 150,
                }
            ]
        );
    }

    #[test]
    fn test_plan_word_to_text_is_direct() {
        let spec = DocumentConvertSpec::parse("convert,source_doc,target_txt").unwrap();
        let source = SourceFormat::parse("doc").unwrap();
        let plan = spec.plan(&source, 300);
        assert_eq!(
            plan.steps,
            vec![ConversionStep::ExtractText { pages: vec![] }]
        );
    }

    #[test]
    fn test_libreoffice_args_shape() {
        let args = libreoffice_convert_args("pdf", "/tmp/out", "/tmp/in.docx");
        assert_eq!(args[0], "--headless");
        assert!(args.contains(&"--convert-to".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/in.docx");
    }

    #[test]
    fn test_resolve_source() {
        let spec = DocumentConvertSpec::parse("convert,target_pdf").unwrap();
        assert_eq!(
            spec.resolve_source("files/report.DOCX").unwrap().kind(),
            DocumentKind::Word
        );
        assert!(spec.resolve_source("files/noext").is_err());

        let explicit = DocumentConvertSpec::parse("convert,source_csv,target_pdf").unwrap();
        // Explicit source beats the key extension
        assert_eq!(
            explicit.resolve_source("files/report.docx").unwrap().kind(),
            DocumentKind::Spreadsheet
        );
    }

    #[test]
    fn test_spec_serializes() {
        let spec = DocumentConvertSpec::parse("convert,source_docx,target_png,pages_1-2").unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"target\":\"png\""));
        let back: DocumentConvertSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
