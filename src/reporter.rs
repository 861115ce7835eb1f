use crate::models::{AnalysisReport, Grade, PageResult, PageStatus};
use anyhow::{Context, Result};
use colored::*;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;

pub struct Reporter;

impl Reporter {
    pub fn print_text_report(report: &AnalysisReport, site: &str) {
        print!("{}", Self::format_text_report(report, site));
    }

    pub fn format_text_report(report: &AnalysisReport, site: &str) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = Self::write_text_report(&mut out, report, site);
        out
    }

    fn write_text_report(out: &mut String, report: &AnalysisReport, site: &str) -> std::fmt::Result {
        let stats = &report.statistics;

        writeln!(out, "\n{}", "=".repeat(80).bright_blue())?;
        writeln!(out, "{}", "SEO Analysis Report".bright_cyan().bold())?;
        writeln!(out, "{}", "=".repeat(80).bright_blue())?;
        writeln!(out)?;
        writeln!(out, "{}: {}", "Site".bright_white().bold(), site)?;
        writeln!(
            out,
            "{}: {}",
            "Timestamp".bright_white().bold(),
            chrono::Utc::now().to_rfc3339()
        )?;
        writeln!(out)?;

        writeln!(out, "{}", "Summary".bright_yellow().bold().underline())?;
        writeln!(
            out,
            "  Pages Analyzed:      {}",
            stats.total_pages.to_string().bright_green()
        )?;
        writeln!(out, "  OK:                  {}", stats.ok_pages.to_string().bright_green())?;
        writeln!(
            out,
            "  Warnings:            {}",
            count_colored(stats.warning_pages, Color::Yellow)
        )?;
        writeln!(
            out,
            "  Errors:              {}",
            count_colored(stats.error_pages, Color::BrightRed)
        )?;
        if let Some(score) = stats.average_score {
            writeln!(out, "  Average Score:       {:.1}", score)?;
        }
        writeln!(
            out,
            "  Average Page Size:   {:.1} KB",
            stats.average_page_size / 1024.0
        )?;
        writeln!(
            out,
            "  Internal Links:      {}",
            stats.total_internal_links
        )?;
        writeln!(
            out,
            "  External Links:      {}",
            stats.total_external_links
        )?;
        writeln!(
            out,
            "  Broken Links:        {}",
            count_colored(stats.total_broken_links, Color::BrightRed)
        )?;
        writeln!(
            out,
            "  HTTPS Pages:         {}/{}",
            stats.https_pages, stats.total_pages
        )?;
        writeln!(
            out,
            "  Mobile Friendly:     {}/{}",
            stats.mobile_friendly_pages, stats.total_pages
        )?;
        writeln!(out)?;

        if !stats.top_issues.is_empty() {
            writeln!(out, "{}", "Top Issues".bright_yellow().bold().underline())?;
            for issue in &stats.top_issues {
                writeln!(out, "  {:>4}x  {}", issue.count, issue.issue)?;
            }
            writeln!(out)?;
        }

        if !report.duplicate_titles.is_empty() || !report.duplicate_descriptions.is_empty() {
            writeln!(out, "{}", "Duplicates".bright_yellow().bold().underline())?;
            for title in &report.duplicate_titles {
                writeln!(out, "  Title:       {}", title)?;
            }
            for description in &report.duplicate_descriptions {
                writeln!(out, "  Description: {}", description)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "{}", "Advanced Checks".bright_yellow().bold().underline())?;
        let sitemap = &report.advanced_checks.sitemap;
        writeln!(
            out,
            "  Sitemap:    {} {}",
            pass_fail(sitemap.valid),
            sitemap.url.as_deref().unwrap_or("")
        )?;
        for issue in &sitemap.issues {
            writeln!(out, "    - {}", issue)?;
        }
        let robots = &report.advanced_checks.robots;
        writeln!(out, "  robots.txt: {}", pass_fail(robots.exists))?;
        for issue in &robots.issues {
            writeln!(out, "    - {}", issue)?;
        }
        writeln!(out)?;

        writeln!(out, "{}", "Pages".bright_yellow().bold().underline())?;
        for page in &report.results {
            write_page(out, page)?;
        }

        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(80).bright_blue())?;
        Ok(())
    }

    pub fn to_json(report: &AnalysisReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize report")
    }

    pub fn save_json_report(report: &AnalysisReport, filename: &str) -> Result<()> {
        let json = Self::to_json(report)?;
        let mut file = File::create(filename)
            .with_context(|| format!("Failed to create report file: {}", filename))?;
        file.write_all(json.as_bytes())?;
        tracing::info!(path = %filename, "Report saved");
        Ok(())
    }
}

fn write_page(out: &mut String, page: &PageResult) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "  {} {}", "URL:".bright_white().bold(), page.url)?;
    writeln!(out, "    Status: {}", status_colored(page.status()))?;

    if let Some(score) = &page.seo_score {
        writeln!(
            out,
            "    Score:  {} ({})  basic {} / content {} / technical {} / performance {}",
            score.score,
            grade_colored(score.grade),
            score.breakdown.basic,
            score.breakdown.content,
            score.breakdown.technical,
            score.breakdown.performance
        )?;
    }

    if let Some(title) = &page.title {
        writeln!(out, "    Title:  {}", title.bright_white())?;
    }

    if !page.issues().is_empty() {
        writeln!(out, "    Issues:")?;
        for issue in page.issues() {
            writeln!(out, "      - {}", issue)?;
        }
    }

    if let Some(detail) = &page.broken_links_detail {
        for broken in detail.broken_links.iter().chain(&detail.broken_images) {
            let status = if broken.status == 0 {
                "unreachable".to_string()
            } else {
                broken.status.to_string()
            };
            writeln!(out, "      {} {} ({})", "broken:".bright_red(), broken.url, status)?;
        }
    }

    Ok(())
}

fn count_colored(count: usize, color: Color) -> ColoredString {
    if count > 0 {
        count.to_string().color(color)
    } else {
        count.to_string().bright_green()
    }
}

fn pass_fail(ok: bool) -> ColoredString {
    if ok { "OK".bright_green() } else { "FAIL".bright_red() }
}

fn status_colored(status: PageStatus) -> ColoredString {
    match status {
        PageStatus::Ok => "OK".bright_green(),
        PageStatus::Warning => "WARNING".yellow(),
        PageStatus::Error => "ERROR".bright_red(),
    }
}

fn grade_colored(grade: Grade) -> ColoredString {
    match grade {
        Grade::A | Grade::B => grade.to_string().bright_green(),
        Grade::C => grade.to_string().yellow(),
        Grade::D | Grade::F => grade.to_string().bright_red(),
    }
}
