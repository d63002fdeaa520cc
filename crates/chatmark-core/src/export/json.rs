//! JSON exporter for conversations

use super::exporter::{DocumentExporter, DocumentFormat, ExportContext};
use crate::conversation::Conversation;
use crate::error::Result;
use crate::types::FormatVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON exporter with compact mode support
pub struct JsonExporter {
    /// Whether to use pretty-print formatting
    pretty: bool,
    /// Format name
    name: &'static str,
}

impl JsonExporter {
    /// Create a compact JSON exporter
    pub fn compact() -> Self {
        Self {
            pretty: false,
            name: "json-compact",
        }
    }

    /// Create a pretty-printed JSON exporter
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            name: "json",
        }
    }
}

/// Envelope around the normalized conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    pub format_version: String,
    pub exported_at: DateTime<Utc>,
    pub conversation: Conversation,
}

#[derive(Serialize)]
struct JsonDocumentRef<'a> {
    format_version: String,
    exported_at: DateTime<Utc>,
    conversation: &'a Conversation,
}

impl DocumentExporter for JsonExporter {
    fn render(&self, ctx: &ExportContext<'_>) -> Result<String> {
        let document = JsonDocumentRef {
            format_version: FormatVersion::V1_0.to_string(),
            exported_at: ctx.exported_at,
            conversation: ctx.conversation,
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };

        Ok(json)
    }

    fn format_name(&self) -> &str {
        self.name
    }

    fn file_extension(&self) -> &str {
        "json"
    }

    fn document_format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    fn uses_images(&self) -> bool {
        false
    }
}
