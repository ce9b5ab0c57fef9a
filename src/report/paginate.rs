//! Cursor-driven pagination of the microtask report

use super::layout::{Block, LayoutConfig, Page, PlacedBlock, ReportDocument};
use super::model::{MicrotaskRecord, ReportMetadata};
use super::wrap::wrap;

pub const SUMMARY_HEADER: [&str; 5] = ["#", "Phase", "Task", "Time", "Weight"];

/// Lay out the report with the default geometry
pub fn paginate(metadata: &ReportMetadata, tasks: &[MicrotaskRecord]) -> ReportDocument {
    paginate_with(&LayoutConfig::default(), metadata, tasks)
}

/// Lay out the report.
///
/// Cover, summary table, optional reasoning, then one detail section per
/// task in input order. Never fails.
pub fn paginate_with(
    config: &LayoutConfig,
    metadata: &ReportMetadata,
    tasks: &[MicrotaskRecord],
) -> ReportDocument {
    let mut paginator = Paginator::new(config);

    // Cover
    paginator.place(Block::Heading {
        text: metadata.title.clone(),
    });
    paginator.key_value(
        "Exported",
        metadata.exported_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    paginator.key_value("Course", metadata.course_id.clone());
    paginator.key_value("Assignment", metadata.assignment_id.clone());
    paginator.key_value("Calibration", metadata.dials.to_string());
    if let Some(attachment) = &metadata.attachment {
        paginator.key_value(
            "Attachment",
            format!(
                "{} ({}, {} bytes)",
                attachment.name, attachment.mime_type, attachment.size_bytes
            ),
        );
    }

    // Summary
    if !tasks.is_empty() {
        paginator.place(Block::Table {
            header: SUMMARY_HEADER.iter().map(ToString::to_string).collect(),
            rows: tasks
                .iter()
                .enumerate()
                .map(|(i, task)| summary_row(i + 1, task))
                .collect(),
        });
    }

    // Reasoning
    if let Some(reasoning) = metadata
        .pedagogical_reasoning
        .as_deref()
        .filter(|r| !r.trim().is_empty())
    {
        paginator.place(Block::Heading {
            text: "Pedagogical reasoning".to_string(),
        });
        paginator.place_lines(wrap(reasoning, config.chars_per_line), |lines, continued| {
            Block::WrappedParagraph { lines, continued }
        });
        if !tasks.is_empty() {
            paginator.new_page();
        }
    }

    // Details
    for task in tasks {
        paginator.keep_together(config.heading_height + config.line_height);
        paginator.place(Block::Heading {
            text: format!("Task {} — {}", task.sequence_id, task.title),
        });
        let task_id = task.sequence_id;
        paginator.place_lines(detail_lines(task, config.chars_per_line), |lines, continued| {
            Block::DetailBlock {
                task_id,
                lines,
                continued,
            }
        });
        paginator.advance(config.task_gap);
    }

    let document = paginator.finish();
    tracing::debug!(
        tasks = tasks.len(),
        pages = document.page_count(),
        "Paginated report"
    );
    document
}

fn summary_row(ordinal: usize, task: &MicrotaskRecord) -> Vec<String> {
    vec![
        ordinal.to_string(),
        task.work_phase.clone(),
        task.title.clone(),
        format!("{}m", task.estimated_minutes),
        format!("{}%", task.weight_percentage),
    ]
}

/// Wrapped detail lines for one task; missing optional fields are skipped
pub fn detail_lines(task: &MicrotaskRecord, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |text: &str| lines.extend(wrap(text, width));

    push(&format!("Phase: {}", task.work_phase));
    if !task.description.trim().is_empty() {
        push(&task.description);
    }
    push(&task.effort_line());
    if let Some(source) = non_empty(task.source_pointer.as_deref()) {
        push(&format!("Source: {source}"));
    }
    if let Some(concepts) = task.concepts.as_ref().filter(|c| !c.is_empty()) {
        push(&format!("Concepts: {}", concepts.join(", ")));
    }
    if let Some(tip) = non_empty(task.scaffold_tip.as_deref()) {
        push(&format!("Tip: {tip}"));
    }
    for step in &task.decomposed_details {
        push(&format!("• {}. {}", step.title, step.description));
    }
    lines
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Cursor
// ============================================================================

struct Paginator<'a> {
    config: &'a LayoutConfig,
    pages: Vec<Page>,
    cursor: f32,
}

impl<'a> Paginator<'a> {
    fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            pages: vec![Page::new(1)],
            cursor: config.margin_top,
        }
    }

    fn remaining(&self) -> f32 {
        self.config.bottom() - self.cursor
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().map_or(true, Page::is_empty)
    }

    fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        self.pages.push(Page::new(number));
        self.cursor = self.config.margin_top;
    }

    /// Open a new page unless `height` fits or the page is still empty
    fn keep_together(&mut self, height: f32) {
        if height > self.remaining() && !self.page_is_empty() {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.cursor += height;
    }

    fn push(&mut self, y: f32, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(PlacedBlock { y, block });
        }
    }

    /// Place an unsplittable block
    fn place(&mut self, block: Block) {
        let height = block.height(self.config);
        self.keep_together(height);
        if height > self.config.usable_height() {
            tracing::warn!(
                page = self.pages.len(),
                height,
                usable = self.config.usable_height(),
                "Block taller than a page; letting it overflow"
            );
        }
        let y = self.cursor;
        self.push(y, block);
        self.advance(height);
    }

    fn key_value(&mut self, key: &str, value: String) {
        self.place(Block::KeyValueLine {
            key: key.to_string(),
            value,
        });
    }

    /// Place lines one at a time, splitting into a continued block at page
    /// breaks
    fn place_lines(&mut self, lines: Vec<String>, make: impl Fn(Vec<String>, bool) -> Block) {
        let line_height = self.config.line_height;
        let mut chunk: Vec<String> = Vec::new();
        let mut chunk_top = self.cursor;
        let mut continued = false;

        for line in lines {
            if line_height > self.remaining() && (!chunk.is_empty() || !self.page_is_empty()) {
                if !chunk.is_empty() {
                    self.push(chunk_top, make(std::mem::take(&mut chunk), continued));
                    continued = true;
                }
                self.new_page();
                chunk_top = self.cursor;
            }
            chunk.push(line);
            self.advance(line_height);
        }

        if !chunk.is_empty() {
            self.push(chunk_top, make(chunk, continued));
        }
    }

    fn finish(self) -> ReportDocument {
        ReportDocument { pages: self.pages }
    }
}
