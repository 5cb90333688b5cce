pub mod hash;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;

pub use hash::{page_hash, sha256_bytes, to_hex};
pub use parse::{
    extract_stop, is_header_line, normalize_lines, parse_route_lines, parse_route_text,
    ParseSummary, RouteParser, StreetCarry,
};
pub use pipeline::{PageScan, PipelineError, RoutePipeline};
pub use preprocess::{prepare_for_ocr, prepare_for_ocr_from_bytes, PreprocessError, PreprocessOptions};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
