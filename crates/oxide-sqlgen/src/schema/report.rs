//! Human-readable grouping of migration operations.

use std::fmt;

use super::operation::DiffOperation;

/// A titled block of the migration report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

fn marker(op: &DiffOperation) -> char {
    match op {
        DiffOperation::CreateTable { .. }
        | DiffOperation::AddColumn { .. }
        | DiffOperation::CreateIndex { .. }
        | DiffOperation::AddForeignKey { .. }
        | DiffOperation::AddUniqueConstraint { .. }
        | DiffOperation::AddPrimaryKey { .. }
        | DiffOperation::CreateEnum { .. } => '+',
        DiffOperation::DropTable { .. }
        | DiffOperation::DropColumn { .. }
        | DiffOperation::DropIndex { .. }
        | DiffOperation::DropForeignKey { .. }
        | DiffOperation::DropUniqueConstraint { .. }
        | DiffOperation::DropPrimaryKey { .. }
        | DiffOperation::DropEnum { .. } => '-',
        DiffOperation::RenameTable { .. }
        | DiffOperation::RenameColumn { .. }
        | DiffOperation::AlterColumn { .. }
        | DiffOperation::AlterEnum { .. } => '~',
    }
}

fn line(op: &DiffOperation) -> String {
    let warning = if op.is_destructive() { " (data loss)" } else { "" };
    format!("{} {}{warning}", marker(op), op.describe())
}

/// Groups operations for display: enum changes, then whole-table
/// changes, then one section per altered table in first-seen order.
#[must_use]
pub fn grouped(ops: &[DiffOperation]) -> Vec<ReportSection> {
    let mut enums = Vec::new();
    let mut tables = Vec::new();
    let mut per_table: Vec<(String, Vec<String>)> = Vec::new();

    for op in ops {
        match op {
            DiffOperation::CreateEnum { .. }
            | DiffOperation::DropEnum { .. }
            | DiffOperation::AlterEnum { .. } => enums.push(line(op)),
            DiffOperation::CreateTable { .. }
            | DiffOperation::DropTable { .. }
            | DiffOperation::RenameTable { .. } => tables.push(line(op)),
            _ => {
                let name = op.table().unwrap_or_default();
                match per_table.iter_mut().find(|(t, _)| t == name) {
                    Some((_, lines)) => lines.push(line(op)),
                    None => per_table.push((String::from(name), vec![line(op)])),
                }
            }
        }
    }

    let mut out = Vec::new();
    if !enums.is_empty() {
        out.push(ReportSection {
            title: String::from("Enums"),
            lines: enums,
        });
    }
    if !tables.is_empty() {
        out.push(ReportSection {
            title: String::from("Tables"),
            lines: tables,
        });
    }
    out.extend(per_table.into_iter().map(|(name, lines)| ReportSection {
        title: format!("Table `{name}`"),
        lines,
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSnapshot, DataType, TableSnapshot};

    #[test]
    fn sections_follow_display_order() {
        let ops = vec![
            DiffOperation::AddColumn {
                table: "users".into(),
                column: ColumnSnapshot::new("bio", DataType::Text),
            },
            DiffOperation::CreateTable {
                table: TableSnapshot::new("posts"),
            },
            DiffOperation::DropColumn {
                table: "users".into(),
                column: "legacy".into(),
            },
            DiffOperation::CreateEnum {
                name: "mood".into(),
                values: vec!["ok".into()],
            },
        ];
        let sections = grouped(&ops);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Enums", "Tables", "Table `users`"]);
        assert_eq!(
            sections[2].lines,
            vec![
                "+ add column `bio` (text) to `users`".to_string(),
                "- drop column `legacy` from `users` (data loss)".to_string(),
            ]
        );
    }

    #[test]
    fn empty_operations_give_no_sections() {
        assert!(grouped(&[]).is_empty());
    }
}
