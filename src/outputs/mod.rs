//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes trend snapshots between pipeline stages
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── trends.json                          # normalized trends
//! ├── trendsWithContent.json               # after extraction and enrichment
//! └── trendsWithContentAndAnalysis.json    # after analysis
//! ```

pub mod json;
