//! Track file validation command
//!
//! Structural checks over the authored definitions, before any geometry is
//! generated. Catches what the build pipeline would otherwise skip item by
//! item at build time, and reports it all at once.

use std::fs;

use anyhow::Result;

use crate::format::{CurveKindDef, TrackFile};

pub struct ValidateArgs {
    pub track: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
        }
    }
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.track)?;
    let file = TrackFile::parse(&text)?;
    let violations = validate(&file);
    let error_count = violations
        .iter()
        .filter(|v| v.severity == Severity::Error)
        .count();

    if args.format == "json" {
        print_json(&violations, error_count);
    } else {
        print_text(&violations);
    }

    if error_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

pub fn validate(file: &TrackFile) -> Vec<Violation> {
    let mut violations = Vec::new();

    if file.path.segment_length <= 0.0 {
        violations.push(Violation::error(
            "path: segment_length must be positive".to_string(),
        ));
    }

    if file.curves.is_empty() {
        violations.push(Violation::error("track has no curves".to_string()));
    } else if file.curves.iter().all(|c| c.jump) {
        violations.push(Violation::error(
            "track consists entirely of jump curves".to_string(),
        ));
    }

    for (index, curve) in file.curves.iter().enumerate() {
        match curve.kind {
            CurveKindDef::Arc => {
                if curve.length <= 0.0 {
                    violations.push(Violation::error(format!(
                        "curve {}: arc length must be positive",
                        index
                    )));
                }
            }
            CurveKindDef::Bezier => {
                if curve.end_position == [0.0; 3] {
                    violations.push(Violation::error(format!(
                        "curve {}: bezier end_position coincides with its start",
                        index
                    )));
                }
            }
        }
        if let Some(template) = &curve.template {
            if !file.templates.contains_key(template) {
                violations.push(Violation::error(format!(
                    "curve {}: references undefined template '{}'",
                    index, template
                )));
            }
        }
    }

    for (name, template) in &file.templates {
        if template.surfaces.is_empty() {
            violations.push(Violation::warning(format!(
                "template '{}': has no surfaces",
                name
            )));
        }
        for surface in &template.surfaces {
            if surface.profile.len() < 2 {
                violations.push(Violation::error(format!(
                    "template '{}' surface '{}': profile needs at least 2 points",
                    name, surface.name
                )));
            }
            if surface.length <= 0.0 {
                violations.push(Violation::error(format!(
                    "template '{}' surface '{}': length must be positive",
                    name, surface.name
                )));
            }
        }
        for (key, group) in &template.spacing_groups {
            match key.parse::<usize>() {
                Ok(index) if index < trackforge_mesh::MAX_SPACING_GROUPS => {}
                Ok(index) => violations.push(Violation::error(format!(
                    "template '{}': spacing group {} out of range (0..{})",
                    name,
                    index,
                    trackforge_mesh::MAX_SPACING_GROUPS
                ))),
                Err(_) => violations.push(Violation::error(format!(
                    "template '{}': spacing group key '{}' is not an index",
                    name, key
                ))),
            }
            let spacing = group.spacing_before + group.spacing_after;
            if spacing < file.path.segment_length {
                violations.push(Violation::error(format!(
                    "template '{}': spacing group '{}' spacing {} is below the sampling step {}",
                    name, key, spacing, file.path.segment_length
                )));
            }
        }
        for spaced in &template.spaced {
            if !template
                .spacing_groups
                .contains_key(&spaced.group.to_string())
            {
                violations.push(Violation::error(format!(
                    "template '{}' object '{}': spacing group {} not declared",
                    name, spaced.name, spaced.group
                )));
            }
        }
    }

    violations
}

fn print_text(violations: &[Violation]) {
    if violations.is_empty() {
        println!("All checks passed.");
        return;
    }
    for violation in violations {
        let severity = match violation.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        println!("  [{}] {}", severity, violation.message);
    }
}

fn print_json(violations: &[Violation], error_count: usize) {
    let items: Vec<serde_json::Value> = violations
        .iter()
        .map(|v| {
            serde_json::json!({
                "severity": match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                },
                "message": v.message,
            })
        })
        .collect();
    let output = serde_json::json!({
        "valid": error_count == 0,
        "errors": error_count,
        "warnings": violations.len() - error_count,
        "violations": items,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(err) => eprintln!("failed to serialize report: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TrackFile {
        TrackFile::parse(text).unwrap()
    }

    #[test]
    fn valid_file_has_no_violations() {
        let file = parse(
            r#"
[track]
name = "ok"

[[curves]]
kind = "arc"
length = 20.0
template = "road"

[templates.road]
[[templates.road.surfaces]]
name = "deck"
profile = [[-4.0, 0.0], [4.0, 0.0]]
length = 10.0
"#,
        );
        assert!(validate(&file).is_empty());
    }

    #[test]
    fn missing_template_reference_is_an_error() {
        let file = parse(
            r#"
[track]
name = "bad"

[[curves]]
kind = "arc"
length = 20.0
template = "ghost"
"#,
        );
        let violations = validate(&file);
        assert!(violations
            .iter()
            .any(|v| v.severity == Severity::Error && v.message.contains("ghost")));
    }

    #[test]
    fn jump_only_and_degenerate_curves_flagged() {
        let file = parse(
            r#"
[track]
name = "bad"

[[curves]]
kind = "arc"
length = 0.0
jump = true

[[curves]]
kind = "bezier"
jump = true
"#,
        );
        let violations = validate(&file);
        assert!(violations.iter().any(|v| v.message.contains("jump")));
        assert!(violations
            .iter()
            .any(|v| v.message.contains("arc length")));
        assert!(violations
            .iter()
            .any(|v| v.message.contains("end_position")));
    }

    #[test]
    fn spacing_group_checks() {
        let file = parse(
            r#"
[track]
name = "bad"

[[curves]]
kind = "arc"
length = 20.0

[templates.road]
[[templates.road.surfaces]]
name = "deck"
profile = [[-4.0, 0.0], [4.0, 0.0]]
length = 10.0

[[templates.road.spaced]]
name = "pole"
group = 99

[templates.road.spacing_groups.99]
spacing_before = 0.05
spacing_after = 0.05
"#,
        );
        let violations = validate(&file);
        assert!(violations
            .iter()
            .any(|v| v.message.contains("out of range")));
        assert!(violations
            .iter()
            .any(|v| v.message.contains("below the sampling step")));
    }
}
