//! Output formatting module
//!
//! This module renders validation reports and graph inspections as text or JSON.

use crate::Result;
use crate::state_machine::StateGraph;
use crate::state_machine::ValidationReport;
use crate::state_machine::analyzer::AnalysisReport;
use serde_json::json;

/// Output a validation report as JSON
pub fn report_json(w: &mut impl std::io::Write, report: &ValidationReport) -> Result<()> {
    let output = json!({
        "machine": report.machine(),
        "valid": report.is_valid(),
        "summary": {
            "errors": report.error_count(),
            "warnings": report.warning_count(),
        },
        "issues": report.issues().iter().map(|issue| {
            json!({
                "severity": issue.severity().name(),
                "code": issue.code(),
                "message": issue.to_string(),
            })
        }).collect::<Vec<_>>(),
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Output a validation report as text
pub fn report_text(w: &mut impl std::io::Write, report: &ValidationReport) -> Result<()> {
    writeln!(w, "Validation report for {}", report.machine())?;
    writeln!(w, "{}", "=".repeat(60))?;

    for issue in report.errors() {
        writeln!(w, "error[{}]: {}", issue.code(), issue)?;
    }
    for issue in report.warnings() {
        writeln!(w, "warning[{}]: {}", issue.code(), issue)?;
    }
    if !report.issues().is_empty() {
        writeln!(w)?;
    }

    if report.is_valid() {
        writeln!(
            w,
            "{} is valid ({} warning(s))",
            report.machine(),
            report.warning_count()
        )?;
    } else {
        writeln!(
            w,
            "{} failed validation with {} error(s) and {} warning(s)",
            report.machine(),
            report.error_count(),
            report.warning_count()
        )?;
    }
    Ok(())
}

/// Output graph facts as JSON
pub fn inspection_json(
    w: &mut impl std::io::Write,
    graph: &StateGraph<'_>,
    analysis: &AnalysisReport,
) -> Result<()> {
    let model = graph.model();
    let stats = graph.stats();

    let output = json!({
        "machine": model.name(),
        "initial": model.initial(),
        "summary": {
            "states": stats.total_states,
            "events": model.events().len(),
            "transitions": stats.total_transitions,
            "reachable_states": stats.reachable_states,
            "unreachable_states": stats.unreachable_states,
            "terminal_states": stats.terminal_states,
            "self_transitions": stats.self_transitions,
        },
        "analysis": {
            "pattern": analysis.pattern.display_name(),
            "branching_factor": analysis.branching_factor,
            "max_depth": analysis.max_depth,
            "has_cycles": analysis.has_cycles,
        },
        "unreachable": graph.unreachable_states(),
        "terminal": graph.terminal_states(),
        "cycles": graph.cycles(),
        "states": model.states().iter().map(|state| {
            json!({
                "name": state.name,
                "entry": state.entry_action,
                "exit": state.exit_action,
                "outgoing": graph.outgoing_transitions(&state.name).len(),
                "incoming": graph.incoming_transitions(&state.name).len(),
            })
        }).collect::<Vec<_>>(),
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Output graph facts as text
pub fn inspection_text(
    w: &mut impl std::io::Write,
    graph: &StateGraph<'_>,
    analysis: &AnalysisReport,
) -> Result<()> {
    let model = graph.model();
    let stats = graph.stats();

    writeln!(w, "State machine {}", model.name())?;
    writeln!(w, "{}", "=".repeat(60))?;
    writeln!(w)?;

    writeln!(w, "Summary:")?;
    writeln!(w, "  Initial State:      {}", model.initial())?;
    writeln!(w, "  States:             {}", stats.total_states)?;
    writeln!(w, "  Events:             {}", model.events().len())?;
    writeln!(w, "  Transitions:        {}", stats.total_transitions)?;
    writeln!(w, "  Reachable States:   {}", stats.reachable_states)?;
    writeln!(w, "  Terminal States:    {}", stats.terminal_states)?;
    writeln!(
        w,
        "  Pattern:            {}",
        analysis.pattern.display_name()
    )?;
    writeln!(w, "  Branching Factor:   {:.2}", analysis.branching_factor)?;
    writeln!(w, "  Max Depth:          {}", analysis.max_depth)?;
    writeln!(w, "  Has Cycles:         {}", analysis.has_cycles)?;
    writeln!(w)?;

    writeln!(w, "States:")?;
    writeln!(w, "{:-<60}", "")?;
    writeln!(w, "{:<36} {:>8} {:>8}", "State", "Out", "In")?;
    writeln!(w, "{:-<60}", "")?;
    for state in model.states() {
        let mut label = state.display_short();
        if !graph.is_reachable(&state.name) {
            label.push_str(" [unreachable]");
        }
        writeln!(
            w,
            "{:<36} {:>8} {:>8}",
            label,
            graph.outgoing_transitions(&state.name).len(),
            graph.incoming_transitions(&state.name).len()
        )?;
    }
    writeln!(w)?;

    if !model.transitions().is_empty() {
        writeln!(w, "Transitions:")?;
        for transition in model.transitions() {
            writeln!(w, "  {}", transition.display_label())?;
        }
        writeln!(w)?;
    }

    let cycles = graph.cycles();
    if !cycles.is_empty() {
        writeln!(w, "Cycles:")?;
        for cycle in cycles {
            writeln!(w, "  {}", cycle.join(" -> "))?;
        }
        writeln!(w)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::analyzer::detect_pattern;
    use crate::state_machine::{Event, Model, State, Transition};

    fn create_test_model() -> Model {
        let mut model = Model::new("OrderStateMachine", "pending").unwrap();
        for name in ["pending", "approved", "shipped", "archived"] {
            model.add_state(State::new(name)).unwrap();
        }
        for name in ["approve", "ship"] {
            model.add_event(Event::new(name)).unwrap();
        }
        model
            .add_transition(Transition::new("pending", "approved", "approve"))
            .unwrap();
        model
            .add_transition(Transition::new("approved", "shipped", "ship"))
            .unwrap();
        model
    }

    #[test]
    fn test_report_json() {
        let model = create_test_model();
        let report = model.validate();

        let mut output = Vec::new();
        report_json(&mut output, &report).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["issues"][0]["code"], "unreachable_state");
        assert_eq!(value["issues"][0]["severity"], "error");
    }

    #[test]
    fn test_report_text() {
        let model = create_test_model();
        let report = model.validate();

        let mut output = Vec::new();
        report_text(&mut output, &report).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("error[unreachable_state]"));
        assert!(text.contains("failed validation with 1 error(s)"));
    }

    #[test]
    fn test_inspection_json() {
        let model = create_test_model();
        let graph = StateGraph::build(&model);
        let analysis = detect_pattern(&graph);

        let mut output = Vec::new();
        inspection_json(&mut output, &graph, &analysis).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["summary"]["states"], 4);
        assert_eq!(value["summary"]["transitions"], 2);
        assert_eq!(value["unreachable"], json!(["archived"]));
        assert_eq!(value["analysis"]["has_cycles"], false);
    }

    #[test]
    fn test_inspection_text() {
        let model = create_test_model();
        let graph = StateGraph::build(&model);
        let analysis = detect_pattern(&graph);

        let mut output = Vec::new();
        inspection_text(&mut output, &graph, &analysis).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("archived [unreachable]"));
        assert!(text.contains("pending --approve--> approved"));
        assert!(text.contains("Has Cycles:         false"));
        assert!(!text.lines().any(|line| line == "Cycles:"));
    }

    #[test]
    fn test_inspection_text_lists_cycles() {
        let mut model = create_test_model();
        model
            .add_transition(Transition::new("shipped", "pending", "approve"))
            .unwrap();
        let graph = StateGraph::build(&model);
        let analysis = detect_pattern(&graph);

        let mut output = Vec::new();
        inspection_text(&mut output, &graph, &analysis).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Has Cycles:         true"));
        assert!(text.lines().any(|line| line == "Cycles:"));
        assert!(text.contains("  approved -> pending -> shipped"));
    }
}
