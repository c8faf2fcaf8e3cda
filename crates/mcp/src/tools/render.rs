// Plain-text rendering of catalog entries for tool results

use sandbox_core::{
    CategoryFilter, OptionEntry, ProgramInfo, ProgramSummary, ScriptCatalog, ScriptInfo,
    ScriptSummary,
};
use std::fmt::Write;

pub fn render_script_list(
    catalog: &ScriptCatalog,
    scripts: &[ScriptSummary],
    filter: CategoryFilter,
) -> String {
    if scripts.is_empty() {
        return format!(
            "No scripts found in {} (category: {})",
            catalog.dir().root().display(),
            filter.as_str()
        );
    }

    let mut out = format!(
        "Scripts ({}, category: {}):\n",
        scripts.len(),
        filter.as_str()
    );
    for script in scripts {
        let host = if catalog.is_host_only(&script.name) {
            ", host-only"
        } else {
            ""
        };
        let _ = write!(out, "  {} [{}{}]", script.name, script.category, host);
        if !script.summary.is_empty() {
            let _ = write!(out, " - {}", script.summary);
        }
        out.push('\n');
    }
    out
}

pub fn render_program_list(root: &std::path::Path, programs: &[ProgramSummary]) -> String {
    if programs.is_empty() {
        return format!("No tools found in {}", root.display());
    }

    let mut out = format!("Tools ({}):\n", programs.len());
    for program in programs {
        let _ = write!(out, "  {}", program.name);
        if !program.summary.is_empty() {
            let _ = write!(out, " - {}", program.summary);
        }
        out.push('\n');
    }
    out
}

fn render_details(
    out: &mut String,
    usage: Option<&str>,
    options: &[OptionEntry],
    environment: &[String],
) {
    if let Some(usage) = usage {
        out.push_str("\nUsage:\n");
        for line in usage.lines() {
            let _ = writeln!(out, "  {}", line.trim_end());
        }
    }

    if !options.is_empty() {
        out.push_str("\nOptions:\n");
        let width = options.iter().map(|o| o.flags.chars().count()).max().unwrap_or(0);
        for option in options {
            if option.description.is_empty() {
                let _ = writeln!(out, "  {}", option.flags);
            } else {
                let _ = writeln!(out, "  {:width$}  {}", option.flags, option.description, width = width);
            }
        }
    }

    if !environment.is_empty() {
        out.push_str("\nEnvironment:\n");
        for line in environment {
            let _ = writeln!(out, "  - {}", line);
        }
    }
}

pub fn render_script_info(info: &ScriptInfo) -> String {
    let mut out = format!("Name: {}\nCategory: {}\n", info.name, info.category);
    if !info.summary.is_empty() {
        let _ = writeln!(out, "Summary: {}", info.summary);
    }
    if info.host_only {
        out.push_str("Host only: yes (run it on the host OS; run_script will refuse it)\n");
    } else {
        out.push_str("Host only: no\n");
    }

    render_details(&mut out, info.usage.as_deref(), &info.options, &info.environment);
    out
}

pub fn render_program_info(info: &ProgramInfo) -> String {
    let mut out = format!("Name: {}\n", info.name);
    if !info.summary.is_empty() {
        let _ = writeln!(out, "Summary: {}", info.summary);
    }

    render_details(&mut out, info.usage.as_deref(), &info.options, &info.environment);
    out
}
