use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::groups::GroupView;
use crate::models::{Course, Group, Student};
use crate::session::Role;

fn student_line(student: &Student) -> String {
    match &student.email {
        Some(email) => format!("{} ({})", student.name, email),
        None => student.name.clone(),
    }
}

pub fn render_roster(course: Option<&Course>, enrolled: &[Student]) -> String {
    let mut output = String::new();

    if let Some(course) = course {
        let _ = writeln!(output, "{}", course.name);
        if let Some(description) = &course.description {
            let _ = writeln!(output, "Description: {description}");
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Enrolled students:");
    if enrolled.is_empty() {
        let _ = writeln!(output, "No students enrolled.");
    } else {
        for student in enrolled {
            let _ = writeln!(output, "- {}", student_line(student));
        }
    }

    output
}

fn group_heading(group: &Group, role: Option<&Role>) -> String {
    match role {
        Some(Role::Student) => format!("Your group is #{}:", group.group_number),
        _ => format!("Group #{}", group.group_number),
    }
}

pub fn render_groups(view: &GroupView) -> String {
    let mut output = String::new();
    let role = view.role();

    if view.groups().is_empty() {
        let _ = writeln!(output, "No groups created yet.");
        return output;
    }

    for group in view.groups() {
        let _ = writeln!(output, "{}", group_heading(group, role.as_ref()));
        if group.student_ids.is_empty() {
            let _ = writeln!(output, "  No students enrolled.");
        }
        for student_id in &group.student_ids {
            let _ = writeln!(output, "  - {}", view.student_label(student_id));
        }
    }

    output
}

pub fn build_report(view: &GroupView, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let course_label = view
        .course()
        .map(|c| c.name.as_str())
        .unwrap_or("unknown course");

    let _ = writeln!(output, "# Course Groups Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        course_label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(user) = view.viewer() {
        let _ = writeln!(output, "Prepared by {}", user.signature());
    }
    let _ = writeln!(output);

    if let Some(course) = view.course() {
        let grouped: usize = view.groups().iter().map(|g| g.student_ids.len()).sum();
        let _ = writeln!(output, "## Summary");
        let _ = writeln!(output, "- Enrolled students: {}", course.student_ids.len());
        let _ = writeln!(output, "- Groups: {}", view.groups().len());
        let _ = writeln!(output, "- Students placed in groups: {grouped}");
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "## Groups");
    if view.groups().is_empty() {
        let _ = writeln!(output, "No groups created yet.");
        return output;
    }

    let mut groups = view.groups().to_vec();
    groups.sort_by_key(|g| g.group_number);
    for group in &groups {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Group {}", group.group_number);
        if group.student_ids.is_empty() {
            let _ = writeln!(output, "No students enrolled.");
        }
        for student_id in &group.student_ids {
            let _ = writeln!(output, "- {}", view.student_label(student_id));
        }
    }

    output
}

/// One CSV row per group membership.
pub fn write_groups_csv<W: std::io::Write>(view: &GroupView, writer: W) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["group_number", "student_id", "name", "email"])?;

    for group in view.groups() {
        let number = group.group_number.to_string();
        for student_id in &group.student_ids {
            let entry = view.directory_entry(student_id);
            let name = entry.map(|s| s.name.as_str()).unwrap_or("");
            let email = entry.and_then(|s| s.email.as_deref()).unwrap_or("");
            csv.write_record([number.as_str(), student_id.as_str(), name, email])?;
        }
    }

    csv.flush()?;
    Ok(())
}
