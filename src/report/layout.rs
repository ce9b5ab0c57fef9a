//! Page geometry and placed blocks

/// Page geometry in points, plus the character budget for wrapping
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub line_height: f32,
    pub heading_height: f32,
    pub table_header_height: f32,
    pub table_row_height: f32,
    /// Vertical space after each task in the detail section
    pub task_gap: f32,
    pub chars_per_line: usize,
}

impl Default for LayoutConfig {
    /// A4 portrait with 10pt body text
    fn default() -> Self {
        Self {
            page_height: 842.0,
            margin_top: 56.0,
            margin_bottom: 56.0,
            line_height: 14.0,
            heading_height: 22.0,
            table_header_height: 20.0,
            table_row_height: 18.0,
            task_gap: 12.0,
            chars_per_line: 90,
        }
    }
}

impl LayoutConfig {
    /// Lowest y a block may reach
    pub fn bottom(&self) -> f32 {
        self.page_height - self.margin_bottom
    }

    /// Height available on an empty page
    pub fn usable_height(&self) -> f32 {
        self.bottom() - self.margin_top
    }
}

/// Content unit placed on a page
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        text: String,
    },
    KeyValueLine {
        key: String,
        value: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Free prose; `continued` marks the tail of a paragraph split across pages
    WrappedParagraph {
        lines: Vec<String>,
        continued: bool,
    },
    /// Detail lines of one task
    DetailBlock {
        task_id: i64,
        lines: Vec<String>,
        continued: bool,
    },
}

impl Block {
    #[allow(clippy::cast_precision_loss)]
    pub fn height(&self, config: &LayoutConfig) -> f32 {
        match self {
            Block::Heading { .. } => config.heading_height,
            Block::KeyValueLine { .. } => config.line_height,
            Block::Table { rows, .. } => {
                config.table_header_height + config.table_row_height * rows.len() as f32
            }
            Block::WrappedParagraph { lines, .. } | Block::DetailBlock { lines, .. } => {
                config.line_height * lines.len() as f32
            }
        }
    }
}

/// A block and the y offset of its top edge
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub y: f32,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based
    pub number: usize,
    pub blocks: Vec<PlacedBlock>,
}

impl Page {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A paginated report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub pages: Vec<Page>,
}

impl ReportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every placed block in reading order
    #[cfg(test)]
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages
            .iter()
            .flat_map(|p| p.blocks.iter().map(|placed| &placed.block))
    }
}
