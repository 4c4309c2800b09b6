//! Markdown and JSON report generation.
//!
//! This module renders an [`AnalysisReport`] as a readable Markdown
//! document or as pretty-printed JSON.

use crate::analysis::merger::ranked_categories;
use crate::models::{
    AnalysisReport, CategoryListing, PostContext, SentimentCategory, SentimentSummary,
};
use anyhow::Result;
use serde_json::Value;

/// Rendering options that are not part of the report itself.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Model that classified the comments.
    pub model_used: String,
    /// Render the post context section.
    pub include_context: bool,
    /// Render the full per-category listing.
    pub include_all_comments: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            model_used: "unknown".to_string(),
            include_context: true,
            include_all_comments: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str("# Comment Sentiment Report\n\n");
    output.push_str(&generate_metadata_section(report, &options.model_used));
    output.push_str(&generate_table_of_contents(report, options));
    output.push_str(&generate_summary_section(report));

    if options.include_context {
        output.push_str(&generate_context_section(&report.post_context));
    }

    output.push_str(&generate_listing_section(
        "Top Comments",
        &report.top_comments,
        &report.summary,
        false,
    ));

    if options.include_all_comments {
        output.push_str(&generate_listing_section(
            "All Comments",
            &report.all_comments,
            &report.summary,
            true,
        ));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &AnalysisReport, model_used: &str) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Post URL:** {}\n", report.post_url));
    section.push_str(&format!("- **Platform:** {}\n", report.platform));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", model_used));
    section.push_str(&format!(
        "- **Comments Analyzed:** {}\n",
        report.summary.total_comments
    ));
    section.push_str(&format!(
        "- **Batches Processed:** {}\n",
        report.batches_processed
    ));
    if report.batches_failed > 0 {
        section.push_str(&format!("- **Batches Failed:** {}\n", report.batches_failed));
    }
    section.push_str(&format!(
        "- **Processing Time:** {:.1}s\n",
        report.processing_time
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &AnalysisReport, options: &ReportOptions) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    if options.include_context {
        toc.push_str("- [Post Context](#post-context)\n");
    }
    toc.push_str("- [Top Comments](#top-comments)\n");
    if options.include_all_comments && !report.all_comments.is_empty() {
        toc.push_str("- [All Comments](#all-comments)\n");
    }
    toc.push('\n');

    toc
}

fn generate_summary_section(report: &AnalysisReport) -> String {
    let summary = &report.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if report.is_partial() {
        section.push_str(&format!(
            "> ⚠️ **Partial results:** {} of {} batches failed. \
             Counts below cover only the comments that were analyzed.\n\n",
            report.batches_failed, report.batches_processed
        ));
    }

    section.push_str("| Sentiment | Comments | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for category in SentimentCategory::ALL {
        section.push_str(&format!(
            "| {} {} | {} | {:.1}% |\n",
            category.emoji(),
            category.label(),
            summary.count(category),
            summary.percentage(category)
        ));
    }
    section.push_str(&format!(
        "| **Total** | **{}** | |\n\n",
        summary.total_comments
    ));

    match ranked_categories(summary).first() {
        Some((category, count)) => section.push_str(&format!(
            "Dominant sentiment: {} **{}** ({} of {} comments).\n\n",
            category.emoji(),
            category.label(),
            count,
            summary.total_comments
        )),
        None => section.push_str("No comments were analyzed.\n\n"),
    }

    section
}

fn generate_context_section(context: &PostContext) -> String {
    let mut section = String::new();

    section.push_str("## Post Context\n\n");

    let mut fields: Vec<(&str, String)> = Vec::new();
    let mut push_text = |label: &'static str, value: &Option<String>| {
        if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            fields.push((label, v.to_string()));
        }
    };
    push_text("Title", &context.title);
    push_text("Description", &context.description);
    push_text("Text", &context.text);
    push_text("Caption", &context.caption);
    push_text("Alt Text", &context.alt);

    if let Some(images) = context.images.as_ref().filter(|i| !i.is_empty()) {
        fields.push(("Images", images.join(", ")));
    }
    if let Some(media) = context.media.as_ref().filter(|m| !m.is_empty()) {
        fields.push(("Media", describe_media(media)));
    }

    if fields.is_empty() {
        section.push_str("*No post context was available.*\n\n");
    } else {
        for (label, value) in fields {
            section.push_str(&format!("**{}:** {}\n\n", label, value));
        }
    }

    // Transcripts can be long; keep them collapsed.
    if let Some(captions) = context.captions.as_deref().filter(|c| !c.trim().is_empty()) {
        section.push_str("<details>\n<summary>Captions</summary>\n\n");
        section.push_str(captions);
        section.push_str("\n</details>\n\n");
    }

    section
}

/// Media items are URLs or objects; prefer a URL-ish field for objects.
fn describe_media(media: &[Value]) -> String {
    media
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            Value::Object(map) => ["thumbnail", "url", "media_url_https"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| item.to_string()),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn generate_listing_section(
    title: &str,
    listing: &CategoryListing,
    summary: &SentimentSummary,
    collapsed: bool,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if listing.is_empty() {
        section.push_str("No comments to show.\n\n");
        return section;
    }

    // Follow the ranking so the biggest groups come first.
    for (category, total) in ranked_categories(summary) {
        let Some(comments) = listing.get(&category) else {
            continue;
        };

        let heading = format!(
            "{} {} ({} of {})",
            category.emoji(),
            category.label(),
            comments.len(),
            total
        );

        if collapsed {
            section.push_str(&format!("<details>\n<summary>{}</summary>\n\n", heading));
        } else {
            section.push_str(&format!("### {}\n\n", heading));
        }

        for comment in comments {
            section.push_str(&format!("- {}\n", comment));
        }

        if collapsed {
            section.push_str("\n</details>\n");
        }
        section.push('\n');
    }

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by commentpulse v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
