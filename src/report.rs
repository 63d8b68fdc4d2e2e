use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{FilterCriteria, RankedStudent, StudentRecord};

const MISSING: &str = "-";

pub fn rank_label(rank: usize) -> String {
    match rank {
        1 => "🏆 1".to_string(),
        2 => "🥈 2".to_string(),
        3 => "🥉 3".to_string(),
        _ => format!("#{rank}"),
    }
}

fn year_label(student: &StudentRecord) -> String {
    student
        .year
        .map(|year| format!("{year} Year"))
        .unwrap_or_else(|| MISSING.to_string())
}

/// Plain-text leaderboard table for the terminal, showing at most `limit` rows.
/// The header always counts the whole filtered view.
pub fn render_table(rows: &[RankedStudent<'_>], limit: Option<usize>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Rankings ({} students)", rows.len());

    if rows.is_empty() {
        let _ = writeln!(output, "No students found");
        let _ = writeln!(output, "Try adjusting your search or filter criteria");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<6} {:<24} {:<10} {:<8} {:<28} {:>6} {:>5} {:>6} {:>5}",
        "Rank", "Student", "Roll", "Year", "Department", "Score", "Easy", "Medium", "Hard"
    );
    let shown = limit.map_or(rows.len(), |limit| limit.min(rows.len()));
    for row in &rows[..shown] {
        let student = row.student;
        let _ = writeln!(
            output,
            "{:<6} {:<24} {:<10} {:<8} {:<28} {:>6} {:>5} {:>6} {:>5}",
            format!("#{}", row.rank),
            student.display_name(),
            student.roll_number.as_deref().unwrap_or(MISSING),
            year_label(student),
            student.department.as_deref().unwrap_or(MISSING),
            student.total_score(),
            student.easy_count(),
            student.medium_count(),
            student.hard_count()
        );
    }
    if shown < rows.len() {
        let _ = writeln!(output, "... {} more", rows.len() - shown);
    }

    output
}

/// Detail panel for one student.
pub fn render_detail(student: &StudentRecord) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", student.display_name());
    let _ = writeln!(
        output,
        "Roll number: {}",
        student.roll_number.as_deref().unwrap_or(MISSING)
    );
    let _ = writeln!(output, "Year: {}", year_label(student));
    let _ = writeln!(
        output,
        "Department: {}",
        student.department.as_deref().unwrap_or(MISSING)
    );
    if let Some(picture) = student.profile_picture.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(output, "Picture: {picture}");
    }
    let _ = writeln!(
        output,
        "Score: {} ({} easy, {} medium, {} hard)",
        student.total_score(),
        student.easy_count(),
        student.medium_count(),
        student.hard_count()
    );

    let links = student.platforms.linked();
    if links.is_empty() {
        let _ = writeln!(output, "No platform profiles linked.");
    } else {
        let _ = writeln!(output, "Profiles:");
        for (name, url) in links {
            let _ = writeln!(output, "- {name}: {url}");
        }
    }

    output
}

pub fn build_report(
    criteria: &FilterCriteria,
    generated_at: DateTime<Utc>,
    total_fetched: usize,
    rows: &[RankedStudent<'_>],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# DSA Leaderboard");
    let _ = writeln!(
        output,
        "Generated {} for {} ({} of {} students)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        criteria.label(),
        rows.len(),
        total_fetched
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");

    if rows.is_empty() {
        let _ = writeln!(output, "No students match these filters.");
    } else {
        for row in rows.iter().take(3) {
            let _ = writeln!(
                output,
                "- {} {} ({}) with a score of {}",
                rank_label(row.rank),
                row.student.display_name(),
                row.student.department.as_deref().unwrap_or(MISSING),
                row.student.total_score()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Rankings");

    if rows.is_empty() {
        let _ = writeln!(output, "No students found.");
    } else {
        let _ = writeln!(
            output,
            "| Rank | Student | Roll | Year | Department | Score | Easy | Medium | Hard |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for row in rows {
            let student = row.student;
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                row.rank,
                student.display_name(),
                student.roll_number.as_deref().unwrap_or(MISSING),
                year_label(student),
                student.department.as_deref().unwrap_or(MISSING),
                student.total_score(),
                student.easy_count(),
                student.medium_count(),
                student.hard_count()
            );
        }
    }

    output
}

#[derive(Serialize)]
struct CsvRow<'a> {
    rank: usize,
    id: i64,
    full_name: &'a str,
    roll_number: &'a str,
    year: Option<u8>,
    department: &'a str,
    total: u32,
    easy: u32,
    medium: u32,
    hard: u32,
}

pub fn write_csv<W: std::io::Write>(writer: W, rows: &[RankedStudent<'_>]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        let student = row.student;
        writer.serialize(CsvRow {
            rank: row.rank,
            id: student.id,
            full_name: student.full_name.as_deref().unwrap_or_default(),
            roll_number: student.roll_number.as_deref().unwrap_or_default(),
            year: student.year,
            department: student.department.as_deref().unwrap_or_default(),
            total: student.total_score(),
            easy: student.easy_count(),
            medium: student.medium_count(),
            hard: student.hard_count(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv(path: &Path, rows: &[RankedStudent<'_>]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(file, rows)
}
